// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit results and the stacking order used to rank candidates.

use kurbo::Point;

use crate::types::{ConnectionId, NodeId, PortId, PortRef, RenderLayer};

/// A port under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct PortHit {
    /// Owning node.
    pub node: NodeId,
    /// The port.
    pub port: PortId,
    /// `true` for output ports.
    pub is_output: bool,
    /// Visual center of the port.
    pub center: Point,
    /// Distance from the query point to [`PortHit::center`].
    pub distance: f64,
}

impl PortHit {
    /// The hit port as a [`PortRef`].
    pub fn port_ref(&self) -> PortRef {
        PortRef {
            node: self.node.clone(),
            port: self.port.clone(),
        }
    }
}

/// What a point resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum HitTarget {
    /// A node body.
    Node(NodeId),
    /// A port.
    Port(PortHit),
    /// A connection stroke.
    Connection(ConnectionId),
    /// Nothing; the empty canvas.
    Canvas,
}

/// Result of [`SceneIndex::hit_test`](crate::SceneIndex::hit_test).
#[derive(Clone, Debug, PartialEq)]
pub struct HitResult {
    /// The resolved target.
    pub target: HitTarget,
    /// The query point.
    pub point: Point,
}

impl HitResult {
    pub(crate) fn new(target: HitTarget, point: Point) -> Self {
        Self { target, point }
    }

    /// Returns `true` if nothing was hit.
    pub fn is_canvas(&self) -> bool {
        matches!(self.target, HitTarget::Canvas)
    }

    /// The hit node, if the target is a node body.
    pub fn node(&self) -> Option<&NodeId> {
        match &self.target {
            HitTarget::Node(id) => Some(id),
            _ => None,
        }
    }

    /// The hit port, if the target is a port.
    pub fn port(&self) -> Option<&PortHit> {
        match &self.target {
            HitTarget::Port(hit) => Some(hit),
            _ => None,
        }
    }

    /// The hit connection, if the target is a connection.
    pub fn connection(&self) -> Option<&ConnectionId> {
        match &self.target {
            HitTarget::Connection(id) => Some(id),
            _ => None,
        }
    }
}

/// Where a node sits in the visual stack. Greater means painted later (on top).
///
/// Ordered by layer, then z-index, then paint position from the render order
/// (unlisted below listed), then insertion sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Stacking {
    pub(crate) layer: RenderLayer,
    pub(crate) z_index: i32,
    pub(crate) paint: Option<usize>,
    pub(crate) seq: u64,
}
