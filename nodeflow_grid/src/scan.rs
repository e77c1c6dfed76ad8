// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear scans over indexed entries. Used when the grid holds only a handful of
//! items, or when a query spans more cells than are occupied.

use alloc::vec::Vec;

use kurbo::{Point, Rect};

use crate::spatial::{contains_point, overlaps};

/// Collect every item whose box overlaps `rect`.
pub(crate) fn scan_rect<'a, T: 'a>(
    entries: impl Iterator<Item = (Rect, &'a T)>,
    rect: Rect,
) -> Vec<&'a T> {
    entries
        .filter(|(bounds, _)| overlaps(*bounds, rect))
        .map(|(_, item)| item)
        .collect()
}

/// Collect every item whose box, grown by `radius`, contains `pt`.
pub(crate) fn scan_point<'a, T: 'a>(
    entries: impl Iterator<Item = (Rect, &'a T)>,
    pt: Point,
    radius: f64,
) -> Vec<&'a T> {
    entries
        .filter(|(bounds, _)| contains_point(*bounds, pt, radius))
        .map(|(_, item)| item)
        .collect()
}
