// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interfaces the rendering layer implements so the index can resolve hits
//! without knowing anything about how the scene is drawn.

use alloc::vec::Vec;
use core::hash::BuildHasher;

use hashbrown::HashMap;
use kurbo::{BezPath, Point, Size};

use crate::types::{Connection, Node, NodeId, Port};

/// Paint order of visible nodes, used to break ties between nodes in the same
/// layer with the same z-index.
pub trait RenderOrder {
    /// Position of `node` in paint order; later positions paint on top.
    ///
    /// Nodes not in the order return `None` and rank below every listed node.
    fn paint_position(&self, node: &NodeId) -> Option<usize>;
}

impl RenderOrder for [NodeId] {
    fn paint_position(&self, node: &NodeId) -> Option<usize> {
        self.iter().position(|id| id == node)
    }
}

impl RenderOrder for Vec<NodeId> {
    fn paint_position(&self, node: &NodeId) -> Option<usize> {
        self.as_slice().paint_position(node)
    }
}

impl<S: BuildHasher> RenderOrder for HashMap<NodeId, usize, S> {
    fn paint_position(&self, node: &NodeId) -> Option<usize> {
        self.get(node).copied()
    }
}

/// Precise hit shapes for nodes that are not rectangles.
pub trait NodeShapes {
    /// The shape to test points against, in canvas coordinates.
    ///
    /// `None` means the node's bounding box is its hit region.
    fn hit_shape(&self, node: &Node) -> Option<BezPath>;
}

impl<F> NodeShapes for F
where
    F: Fn(&Node) -> Option<BezPath>,
{
    fn hit_shape(&self, node: &Node) -> Option<BezPath> {
        self(node)
    }
}

/// Resolves the visual size of a port.
pub trait PortSizes {
    /// Size of `port` on `node`, or `None` to fall back to [`Port::size`] and
    /// then to the index default.
    fn port_size(&self, node: &Node, port: &Port) -> Option<Size>;
}

impl<F> PortSizes for F
where
    F: Fn(&Node, &Port) -> Option<Size>,
{
    fn port_size(&self, node: &Node, port: &Port) -> Option<Size> {
        self(node, port)
    }
}

/// Point-in-stroke test against a connection's rendered path.
///
/// Segment boxes in the index are conservative; a tester narrows a segment-box
/// hit down to the actual stroke.
pub trait ConnectionHitTester {
    /// Returns `true` if `point` is on the stroke of `connection`.
    fn hit_connection(
        &self,
        connection: &Connection,
        source: &Node,
        target: &Node,
        point: Point,
    ) -> bool;
}

impl<F> ConnectionHitTester for F
where
    F: Fn(&Connection, &Node, &Node, Point) -> bool,
{
    fn hit_connection(
        &self,
        connection: &Connection,
        source: &Node,
        target: &Node,
        point: Point,
    ) -> bool {
        self(connection, source, target, point)
    }
}
