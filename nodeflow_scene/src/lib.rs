// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nodeflow Scene: a spatial index for node-and-connection canvases.
//!
//! A [`SceneIndex`] holds the nodes, ports, and connections of a graph editor
//! canvas and answers "what is under the pointer?" with a single [`HitResult`].
//! It is the glue between the broad phase in [`nodeflow_grid`] and whatever
//! draws the scene.
//!
//! ## Records
//!
//! - [`Node`]: bounding box, [`RenderLayer`], z-index, [`NodeFlags`], and [`Port`]s.
//! - [`Connection`]: a source [`PortRef`] and a target [`PortRef`].
//!
//! The index owns copies of these. Updating geometry means passing a new record
//! to [`SceneIndex::update`]; the index re-derives port snap boxes from it.
//! Connections carry no geometry of their own: the caller supplies a list of
//! segment boxes with [`SceneIndex::update_connection`], typically computed by
//! `nodeflow_paths`.
//!
//! ## Hit resolution
//!
//! [`SceneIndex::hit_test`] checks, top to bottom:
//!
//! 1. [`RenderLayer::Foreground`] nodes,
//! 2. ports, nearest center first, unless another node is painted over them,
//! 3. [`RenderLayer::Middle`] nodes,
//! 4. connections, most recently inserted first,
//! 5. [`RenderLayer::Background`] nodes,
//!
//! and falls back to [`HitTarget::Canvas`]. Within a layer, higher z-index wins,
//! then the position reported by an optional [`RenderOrder`], then insertion order.
//!
//! Rendering-specific knowledge is plugged in through small traits:
//! [`RenderOrder`], [`NodeShapes`], [`PortSizes`], and [`ConnectionHitTester`].
//!
//! ## Drags and batches
//!
//! - [`SceneIndex::start_dragging`] keeps the grid exact for the dragged nodes,
//!   their ports, and their connections, and defers every other update.
//! - [`SceneIndex::batch`] coalesces change notifications into one.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use nodeflow_scene::{HitTarget, Node, Port, PortSide, SceneIndex};
//!
//! let mut scene = SceneIndex::new();
//! scene.update(
//!     Node::new("a", Rect::new(0.0, 0.0, 100.0, 60.0))
//!         .with_port(Port::output("out", PortSide::Right)),
//! );
//!
//! assert_eq!(scene.hit_test(Point::new(50.0, 30.0)).node().map(|id| id.as_str()), Some("a"));
//! assert!(matches!(scene.hit_test(Point::new(101.0, 30.0)).target, HitTarget::Port(_)));
//! assert!(scene.hit_test(Point::new(500.0, 500.0)).is_canvas());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod hit;
mod index;
mod providers;
mod query;
mod types;

pub use hit::{HitResult, HitTarget, PortHit};
pub use index::{
    PortRecord, SceneConfig, SceneDiagnostics, SceneIndex, SceneStats, SpatialKey, SpatialRecord,
};
pub use providers::{ConnectionHitTester, NodeShapes, PortSizes, RenderOrder};
pub use types::{
    Connection, ConnectionId, Node, NodeFlags, NodeId, Port, PortId, PortRef, PortSide,
    RenderLayer,
};
