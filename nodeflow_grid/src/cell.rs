// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell addressing.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Rect;

/// Integer address of a grid cell: `(floor(x / size), floor(y / size))`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl CellCoord {
    /// Create a cell coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive rectangle of cells covered by a box.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellRange {
    /// Leftmost column.
    pub min_x: i32,
    /// Topmost row.
    pub min_y: i32,
    /// Rightmost column (inclusive).
    pub max_x: i32,
    /// Bottom row (inclusive).
    pub max_y: i32,
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "float to int casts saturate; coordinates beyond i32 cells collapse onto the edge cells."
)]
#[inline]
fn cell_index(v: f64, cell_size: f64) -> i32 {
    (v / cell_size).floor() as i32
}

impl CellRange {
    /// Cells overlapped by `rect`, edges included.
    pub fn covering(rect: Rect, cell_size: f64) -> Self {
        Self {
            min_x: cell_index(rect.x0, cell_size),
            min_y: cell_index(rect.y0, cell_size),
            max_x: cell_index(rect.x1, cell_size),
            max_y: cell_index(rect.y1, cell_size),
        }
    }

    /// Returns `true` if `cell` lies inside the range.
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min_x && cell.x <= self.max_x && cell.y >= self.min_y && cell.y <= self.max_y
    }

    /// Number of cells in the range, saturating.
    pub fn cell_count(&self) -> u64 {
        let w = (i64::from(self.max_x) - i64::from(self.min_x) + 1).max(0);
        let h = (i64::from(self.max_y) - i64::from(self.min_y) + 1).max(0);
        w.unsigned_abs().saturating_mul(h.unsigned_abs())
    }

    /// Iterate cells row by row.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + use<> {
        let Self {
            min_x,
            min_y,
            max_x,
            max_y,
        } = *self;
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| CellCoord::new(x, y)))
    }
}
