// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nodeflow Grid: a uniform-grid spatial hash over 2D bounding boxes.
//!
//! This is the broad phase of the Nodeflow hit-testing stack. It maps point and
//! rectangle queries to the items whose axis-aligned boxes they touch, and is
//! tuned for scenes where a few items move every frame (drags) while the rest
//! stay put.
//!
//! - [`SpatialGrid`] stores items implementing [`Spatial`] and buckets them into
//!   square cells addressed by [`CellCoord`].
//! - Updates are incremental: [`SpatialGrid::insert`] only touches the cells an
//!   item leaves or enters, and [`SpatialGrid::remove`] drops cells that become empty.
//! - Drag mode ([`SpatialGrid::start_dragging`]) applies updates for the dragged
//!   keys immediately and parks everything else until the next flush.
//! - [`SpatialGrid::diagnostics`] cross-checks cell membership against the item map.
//!
//! ## Query semantics
//!
//! Cell bucketing never changes a result. [`SpatialGrid::query`] returns exactly
//! the items for which [`overlaps`] holds, and [`SpatialGrid::query_point`]
//! exactly those for which [`contains_point`] holds. Both predicates are exported
//! so callers can reason about edges the same way the grid does.
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::{Point, Rect};
//! use nodeflow_grid::{Spatial, SpatialGrid};
//!
//! struct Box2 {
//!     id: u32,
//!     rect: Rect,
//! }
//!
//! impl Spatial for Box2 {
//!     type Key = u32;
//!     fn key(&self) -> u32 {
//!         self.id
//!     }
//!     fn bounds(&self) -> Rect {
//!         self.rect
//!     }
//! }
//!
//! let mut grid = SpatialGrid::new();
//! grid.insert(Box2 { id: 1, rect: Rect::new(0.0, 0.0, 40.0, 40.0) });
//! grid.insert(Box2 { id: 2, rect: Rect::new(30.0, 30.0, 90.0, 90.0) });
//!
//! let hits = grid.query_point(Point::new(35.0, 35.0), 0.0);
//! assert_eq!(hits.len(), 2);
//! ```
//!
//! Float inputs are expected to be finite; boxes that are not are rejected
//! rather than indexed.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cell;
mod grid;
mod scan;
mod spatial;

pub use cell::{CellCoord, CellRange};
pub use grid::{GridConfig, GridDiagnostics, SpatialGrid};
pub use spatial::{Spatial, contains_point, is_indexable, overlaps};
