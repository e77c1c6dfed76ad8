// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use nodeflow_scene::{ConnectionId, NodeId, PortId};

/// A connection path was requested with endpoints that do not fit the connection.
///
/// Hit testing never produces this; it only comes out of the methods that build
/// geometry, where wrong endpoints are a caller bug rather than a miss.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The node passed for one end is not the node the connection names.
    #[error("connection {connection} expects node {expected}, got {found}")]
    EndpointMismatch {
        /// The connection being routed.
        connection: ConnectionId,
        /// Node named by the connection.
        expected: NodeId,
        /// Node that was passed in.
        found: NodeId,
    },
    /// The connection names a port the node does not have.
    #[error("node {node} has no port {port}")]
    MissingPort {
        /// The node that was searched.
        node: NodeId,
        /// The port that was missing.
        port: PortId,
    },
}
