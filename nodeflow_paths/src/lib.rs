// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nodeflow Paths: connection geometry and precise stroke hit testing.
//!
//! This crate turns a [`Connection`](nodeflow_scene::Connection) between two
//! [`Node`](nodeflow_scene::Node)s into drawable geometry, and keeps the
//! geometry cached until an endpoint moves.
//!
//! - [`ConnectionStyle`] and [`PathKind`] describe the curve: straight, cubic,
//!   or orthogonal with rounded corners, plus gaps, stroke width, and hit tolerance.
//! - [`Endpoints::resolve`] finds both port anchors; a connection routed between
//!   the wrong nodes is a [`PathError`].
//! - [`HitPath`] is the flattened centerline with a hit radius. It answers
//!   point-in-stroke queries and yields the segment boxes a
//!   [`SceneIndex`](nodeflow_scene::SceneIndex) indexes for the connection.
//! - [`ConnectionPathCache`] stores both per connection. Building is explicit
//!   ([`ConnectionPathCache::get_or_create_path`]); hit testing is read-only and
//!   reports "no hit" for entries whose endpoints have moved.
//!
//! The cache implements [`ConnectionHitTester`](nodeflow_scene::ConnectionHitTester),
//! so it can be handed straight to
//! [`SceneIndex::hit_test_with`](nodeflow_scene::SceneIndex::hit_test_with).
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use nodeflow_paths::{ConnectionPathCache, ConnectionStyle};
//! use nodeflow_scene::{Connection, Node, Port, PortRef, PortSide, SceneIndex};
//!
//! let a = Node::new("a", Rect::new(0.0, 0.0, 100.0, 60.0))
//!     .with_port(Port::output("out", PortSide::Right));
//! let b = Node::new("b", Rect::new(300.0, 0.0, 400.0, 60.0))
//!     .with_port(Port::input("in", PortSide::Left));
//! let link = Connection::new("link", PortRef::new("a", "out"), PortRef::new("b", "in"));
//!
//! let mut cache = ConnectionPathCache::new();
//! let style = ConnectionStyle::default();
//! let segments = cache.segments_for(&link, &a, &b, &style).unwrap();
//!
//! let mut scene = SceneIndex::new();
//! scene.update(a);
//! scene.update(b);
//! scene.update_connection(link, segments);
//!
//! let hit = scene.hit_test_with(Point::new(200.0, 30.0), &cache);
//! assert_eq!(hit.connection().map(|id| id.as_str()), Some("link"));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cache;
mod error;
mod hit_path;
mod style;

pub use cache::{CacheStats, ConnectionPathCache};
pub use error::PathError;
pub use hit_path::{FLATTEN_TOLERANCE, HitPath};
pub use style::{ConnectionStyle, Endpoints, PathKind};
