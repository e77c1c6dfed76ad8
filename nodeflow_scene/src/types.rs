// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: identifiers, flags, and the node/port/connection records.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect, Size, Vec2};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(id: impl Into<Arc<str>>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(Arc::from(id))
            }
        }

        impl From<alloc::string::String> for $name {
            fn from(id: alloc::string::String) -> Self {
                Self(Arc::from(id))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), &*self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Identifier of a node. Cheap to clone.
    NodeId
}

string_id! {
    /// Identifier of a port, unique within its owning node.
    PortId
}

string_id! {
    /// Identifier of a connection. Cheap to clone.
    ConnectionId
}

/// A port addressed through its owning node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    /// Owning node.
    pub node: NodeId,
    /// Port within that node.
    pub port: PortId,
}

impl PortRef {
    /// Create a port reference.
    pub fn new(node: impl Into<NodeId>, port: impl Into<PortId>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible (participates in rendering and bulk queries).
        const VISIBLE  = 0b0000_0001;
        /// Node is pickable (participates in point hit testing).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Coarse stacking group. Every foreground node paints above every middle
/// node, which paints above every background node, regardless of z-index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderLayer {
    /// Behind connections (group frames, annotations).
    Background,
    /// Regular nodes, above connections.
    #[default]
    Middle,
    /// Above everything, including ports of other nodes.
    Foreground,
}

/// The edge of a node a port sits on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PortSide {
    /// Left edge.
    #[default]
    Left,
    /// Top edge.
    Top,
    /// Right edge.
    Right,
    /// Bottom edge.
    Bottom,
}

impl PortSide {
    /// Unit vector pointing out of the node through this side.
    pub const fn outward(self) -> Vec2 {
        match self {
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Top => Vec2::new(0.0, -1.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Bottom => Vec2::new(0.0, 1.0),
        }
    }

    /// Midpoint of this side of `rect`.
    pub fn midpoint(self, rect: Rect) -> Point {
        let c = rect.center();
        match self {
            Self::Left => Point::new(rect.x0, c.y),
            Self::Top => Point::new(c.x, rect.y0),
            Self::Right => Point::new(rect.x1, c.y),
            Self::Bottom => Point::new(c.x, rect.y1),
        }
    }
}

/// A connection endpoint on a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    /// Identifier, unique within the owning node.
    pub id: PortId,
    /// `true` for ports connections leave from.
    pub is_output: bool,
    /// Which edge of the node the port sits on.
    pub side: PortSide,
    /// Offset of the port's visual center from the midpoint of [`Port::side`].
    pub offset: Vec2,
    /// Visual size. `None` defers to the index's port size resolution.
    pub size: Option<Size>,
}

impl Port {
    /// An input port centered on `side`.
    pub fn input(id: impl Into<PortId>, side: PortSide) -> Self {
        Self {
            id: id.into(),
            is_output: false,
            side,
            offset: Vec2::ZERO,
            size: None,
        }
    }

    /// An output port centered on `side`.
    pub fn output(id: impl Into<PortId>, side: PortSide) -> Self {
        Self {
            is_output: true,
            ..Self::input(id, side)
        }
    }

    /// Move the port away from the side's midpoint.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Give the port an explicit visual size.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }
}

/// A node record as the index sees it.
///
/// The index keeps its own copy. Changing geometry means building a new `Node`
/// and passing it to [`SceneIndex::update`](crate::SceneIndex::update).
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Identifier.
    pub id: NodeId,
    /// Position and size in canvas coordinates.
    pub bounds: Rect,
    /// Stacking group.
    pub layer: RenderLayer,
    /// Stacking order within the layer. Higher is drawn on top.
    pub z_index: i32,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
    /// Ports, in declaration order.
    pub ports: Vec<Port>,
}

impl Node {
    /// A visible, pickable middle-layer node with no ports.
    pub fn new(id: impl Into<NodeId>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            bounds,
            layer: RenderLayer::Middle,
            z_index: 0,
            flags: NodeFlags::default(),
            ports: Vec::new(),
        }
    }

    /// Set the render layer.
    pub fn with_layer(mut self, layer: RenderLayer) -> Self {
        self.layer = layer;
        self
    }

    /// Set the z-index.
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Append a port.
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Returns `true` if the node is visible.
    pub fn is_visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    /// Returns `true` if the node is visible and pickable.
    pub fn is_pickable(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE | NodeFlags::PICKABLE)
    }

    /// Look up a port by id. When ids repeat, the last declaration wins.
    pub fn port(&self, id: &PortId) -> Option<&Port> {
        self.ports.iter().rev().find(|p| &p.id == id)
    }

    /// Visual center of `port` in canvas coordinates.
    pub fn port_center(&self, port: &Port) -> Point {
        port.side.midpoint(self.bounds) + port.offset
    }
}

/// A connection between two ports.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Identifier.
    pub id: ConnectionId,
    /// Node the connection leaves from.
    pub source: NodeId,
    /// Port on [`Connection::source`].
    pub source_port: PortId,
    /// Node the connection arrives at.
    pub target: NodeId,
    /// Port on [`Connection::target`].
    pub target_port: PortId,
}

impl Connection {
    /// Create a connection from `source` to `target`.
    pub fn new(id: impl Into<ConnectionId>, source: PortRef, target: PortRef) -> Self {
        Self {
            id: id.into(),
            source: source.node,
            source_port: source.port,
            target: target.node,
            target_port: target.port,
        }
    }

    /// The source endpoint.
    pub fn source_ref(&self) -> PortRef {
        PortRef {
            node: self.source.clone(),
            port: self.source_port.clone(),
        }
    }

    /// The target endpoint.
    pub fn target_ref(&self) -> PortRef {
        PortRef {
            node: self.target.clone(),
            port: self.target_port.clone(),
        }
    }

    /// Returns `true` if either endpoint is on `node`.
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}
