// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene index: record storage, grid synchronization, batching, and drag mode.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use kurbo::{Point, Rect, Size};
use nodeflow_grid::{GridConfig, GridDiagnostics, Spatial, SpatialGrid, is_indexable};
use smallvec::SmallVec;

use crate::hit::Stacking;
use crate::providers::{NodeShapes, PortSizes, RenderOrder};
use crate::types::{Connection, ConnectionId, Node, NodeId, Port, PortId, PortRef};

/// Configuration for [`SceneIndex`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
    /// Configuration of the underlying grid.
    pub grid: GridConfig,
    /// Port size used when neither a [`PortSizes`] provider nor [`Port::size`] supplies one.
    pub port_size: Size,
    /// Extra margin around every port's visual box, on each side.
    pub snap_distance: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            port_size: Size::new(9.0, 9.0),
            snap_distance: 8.0,
        }
    }
}

impl SceneConfig {
    /// Set the grid configuration.
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Set the default port size.
    pub fn with_port_size(mut self, size: Size) -> Self {
        self.port_size = size;
        self
    }

    /// Set the snap distance. Negative values are clamped to zero.
    pub fn with_snap_distance(mut self, snap_distance: f64) -> Self {
        self.snap_distance = snap_distance.max(0.0);
        self
    }
}

/// Key of a grid entry owned by the scene.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpatialKey {
    /// A node body.
    Node(NodeId),
    /// A port's snap box.
    Port(PortRef),
    /// One hit-test segment of a connection.
    Segment(ConnectionId, u32),
}

/// The record the scene stores in its grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialRecord {
    /// What the box belongs to.
    pub key: SpatialKey,
    /// Bounding box.
    pub bounds: Rect,
}

impl Spatial for SpatialRecord {
    type Key = SpatialKey;

    fn key(&self) -> SpatialKey {
        self.key.clone()
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// Derived geometry of a port, regenerated whenever its node is updated.
#[derive(Clone, Debug, PartialEq)]
pub struct PortRecord {
    /// Owning node.
    pub node: NodeId,
    /// The port.
    pub port: PortId,
    /// `true` for output ports.
    pub is_output: bool,
    /// Visual center.
    pub center: Point,
    /// Visual box grown by the snap distance.
    pub bounds: Rect,
}

#[derive(Debug)]
pub(crate) struct NodeEntry {
    pub(crate) node: Node,
    pub(crate) seq: u64,
}

#[derive(Debug)]
pub(crate) struct ConnectionEntry {
    pub(crate) connection: Connection,
    pub(crate) seq: u64,
    pub(crate) segments: Vec<Rect>,
}

/// Record and grid counters, for debugging overlays and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Node records.
    pub nodes: usize,
    /// Port records.
    pub ports: usize,
    /// Connection records.
    pub connections: usize,
    /// Segment boxes across all connections.
    pub segments: usize,
    /// Non-empty grid cells.
    pub cells: usize,
    /// Deferred grid updates.
    pub pending: usize,
    /// Boxes the grid refused to index.
    pub rejected: u64,
}

/// Mismatches between the record maps and the grid. Empty when healthy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneDiagnostics {
    /// Cell membership vs grid item map.
    pub grid: GridDiagnostics<SpatialKey>,
    /// Records with indexable bounds that the grid neither indexes nor has pending.
    pub unindexed_records: Vec<SpatialKey>,
    /// Grid entries (indexed or pending) with no backing record.
    pub orphaned_entries: Vec<SpatialKey>,
    /// Records indexed under bounds that differ from the record's, with no update pending.
    pub stale_records: Vec<SpatialKey>,
}

impl SceneDiagnostics {
    /// Returns `true` if records and grid agree.
    pub fn is_consistent(&self) -> bool {
        self.grid.is_consistent()
            && self.unindexed_records.is_empty()
            && self.orphaned_entries.is_empty()
            && self.stale_records.is_empty()
    }
}

/// Spatial index over the nodes, ports, and connections of one scene.
///
/// The index owns a copy of every record it was given and keeps one
/// [`SpatialGrid`] in sync with them. Geometry changes flow in through
/// [`update`](Self::update) and [`update_connection`](Self::update_connection);
/// queries flow out through the hit-testing methods.
///
/// Every committed mutation bumps [`version`](Self::version) and notifies
/// [`subscribe`](Self::subscribe)d listeners, at most once per
/// [`batch`](Self::batch).
pub struct SceneIndex {
    pub(crate) config: SceneConfig,
    pub(crate) grid: SpatialGrid<SpatialRecord>,
    pub(crate) nodes: HashMap<NodeId, NodeEntry>,
    pub(crate) ports: HashMap<PortRef, PortRecord>,
    pub(crate) connections: HashMap<ConnectionId, ConnectionEntry>,
    node_connections: HashMap<NodeId, SmallVec<[ConnectionId; 4]>>,
    dragging_nodes: HashSet<NodeId>,
    dragging_connections: HashSet<ConnectionId>,
    next_seq: u64,
    version: u64,
    batch_depth: u32,
    batch_dirty: bool,
    listeners: Vec<Box<dyn FnMut(u64)>>,
    pub(crate) render_order: Option<Box<dyn RenderOrder>>,
    pub(crate) shapes: Option<Box<dyn NodeShapes>>,
    port_sizes: Option<Box<dyn PortSizes>>,
}

impl fmt::Debug for SceneIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneIndex")
            .field("config", &self.config)
            .field("grid", &self.grid)
            .field("nodes", &self.nodes.len())
            .field("ports", &self.ports.len())
            .field("connections", &self.connections.len())
            .field("version", &self.version)
            .field("batch_depth", &self.batch_depth)
            .field("listeners", &self.listeners.len())
            .field("render_order", &self.render_order.is_some())
            .field("shapes", &self.shapes.is_some())
            .field("port_sizes", &self.port_sizes.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SceneIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "segment indices are u32 by design; connections never carry 4 billion segments."
)]
#[inline]
fn segment_index(i: usize) -> u32 {
    i as u32
}

impl SceneIndex {
    /// Create an empty index with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create an empty index with `config`.
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            config,
            grid: SpatialGrid::with_config(config.grid),
            nodes: HashMap::new(),
            ports: HashMap::new(),
            connections: HashMap::new(),
            node_connections: HashMap::new(),
            dragging_nodes: HashSet::new(),
            dragging_connections: HashSet::new(),
            next_seq: 0,
            version: 0,
            batch_depth: 0,
            batch_dirty: false,
            listeners: Vec::new(),
            render_order: None,
            shapes: None,
            port_sizes: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    // --- mutation ---

    /// Store `node`, replacing any node with the same id, and re-derive its
    /// box and every port box.
    ///
    /// Ports missing from the new record are removed before the new set is indexed.
    pub fn update(&mut self, node: Node) {
        let existing = self.nodes.get(&node.id).map(|entry| {
            let ports: Vec<PortId> = entry.node.ports.iter().map(|p| p.id.clone()).collect();
            (entry.seq, ports)
        });
        let (seq, old_ports) = match existing {
            Some(found) => found,
            None => (self.alloc_seq(), Vec::new()),
        };
        self.index_node(&node, &old_ports);
        self.nodes.insert(node.id.clone(), NodeEntry { node, seq });
        self.touch();
    }

    /// Replace the segment boxes of `connection`.
    ///
    /// The previous segment set is removed in full before the new one is
    /// indexed. An empty `segments` list is valid: the connection stays
    /// queryable by id but cannot be hit.
    pub fn update_connection<I>(&mut self, connection: Connection, segments: I)
    where
        I: IntoIterator<Item = Rect>,
    {
        let id = connection.id.clone();
        let segments: Vec<Rect> = segments.into_iter().collect();
        let seq = match self.connections.remove(&id) {
            Some(old) => {
                self.remove_segments(&id, old.segments.len());
                self.unlink_adjacency(&old.connection);
                old.seq
            }
            None => self.alloc_seq(),
        };

        if self.dragging_nodes.contains(&connection.source)
            || self.dragging_nodes.contains(&connection.target)
        {
            self.dragging_connections.insert(id.clone());
        }
        let dragged = self.dragging_connections.contains(&id);
        for (i, bounds) in segments.iter().enumerate() {
            let key = SpatialKey::Segment(id.clone(), segment_index(i));
            if dragged {
                self.grid.add_dragging(key.clone());
            }
            self.grid.insert(SpatialRecord {
                key,
                bounds: *bounds,
            });
        }

        self.link_adjacency(&connection);
        self.connections.insert(
            id,
            ConnectionEntry {
                connection,
                seq,
                segments,
            },
        );
        self.touch();
    }

    /// Remove a node and its ports. Returns the removed record.
    ///
    /// Connections attached to the node are kept but stop matching queries
    /// until the node returns or the connection is removed.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let entry = self.nodes.remove(id)?;
        self.grid.remove(&SpatialKey::Node(id.clone()));
        for port in &entry.node.ports {
            let port_ref = PortRef {
                node: id.clone(),
                port: port.id.clone(),
            };
            self.ports.remove(&port_ref);
            self.grid.remove(&SpatialKey::Port(port_ref));
        }
        self.dragging_nodes.remove(id);
        self.touch();
        Some(entry.node)
    }

    /// Remove a connection and all its segments. Returns the removed record.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        let entry = self.connections.remove(id)?;
        self.remove_segments(id, entry.segments.len());
        self.unlink_adjacency(&entry.connection);
        self.dragging_connections.remove(id);
        self.touch();
        Some(entry.connection)
    }

    /// Drop every record. Providers and listeners are kept.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.nodes.clear();
        self.ports.clear();
        self.connections.clear();
        self.node_connections.clear();
        self.dragging_nodes.clear();
        self.dragging_connections.clear();
        self.touch();
    }

    /// Run `body` with change notification deferred until it returns.
    ///
    /// Listeners see at most one notification for the whole batch, and none if
    /// nothing changed. Batches nest; only the outermost one notifies.
    pub fn batch<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let out = body(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && core::mem::take(&mut self.batch_dirty) {
            self.bump();
        }
        out
    }

    /// Replace the whole scene.
    ///
    /// Equivalent to [`clear`](Self::clear) followed by [`update`](Self::update)
    /// for every node and [`update_connection`](Self::update_connection) for every
    /// connection, inside one [`batch`](Self::batch). `segments` computes the
    /// segment boxes of a connection from its endpoint nodes; connections whose
    /// endpoints are missing get no segments.
    pub fn rebuild<N, C, F>(&mut self, nodes: N, connections: C, mut segments: F)
    where
        N: IntoIterator<Item = Node>,
        C: IntoIterator<Item = Connection>,
        F: FnMut(&Connection, &Node, &Node) -> Vec<Rect>,
    {
        self.batch(|index| {
            index.clear();
            for node in nodes {
                index.update(node);
            }
            for connection in connections {
                let boxes = match (index.node(&connection.source), index.node(&connection.target)) {
                    (Some(source), Some(target)) => segments(&connection, source, target),
                    _ => Vec::new(),
                };
                index.update_connection(connection, boxes);
            }
        });
        log::trace!(
            "scene rebuilt: {} nodes, {} connections",
            self.nodes.len(),
            self.connections.len()
        );
    }

    // --- drag mode ---

    /// Enter drag mode for `nodes`.
    ///
    /// Updates to the dragged nodes, their ports, and the segments of their
    /// connections are indexed immediately; updates to everything else are
    /// deferred until [`end_dragging`](Self::end_dragging) or
    /// [`flush_pending_updates`](Self::flush_pending_updates).
    pub fn start_dragging<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        if self.grid.is_dragging() {
            self.end_dragging();
        }
        let mut keys = Vec::new();
        for id in nodes {
            if let Some(entry) = self.nodes.get(&id) {
                keys.push(SpatialKey::Node(id.clone()));
                keys.extend(entry.node.ports.iter().map(|p| {
                    SpatialKey::Port(PortRef {
                        node: id.clone(),
                        port: p.id.clone(),
                    })
                }));
            }
            for conn in self.node_connections.get(&id).into_iter().flatten() {
                if !self.dragging_connections.insert(conn.clone()) {
                    continue;
                }
                if let Some(entry) = self.connections.get(conn) {
                    keys.extend(
                        (0..entry.segments.len())
                            .map(|i| SpatialKey::Segment(conn.clone(), segment_index(i))),
                    );
                }
            }
            self.dragging_nodes.insert(id);
        }
        self.grid.start_dragging(keys);
    }

    /// Leave drag mode, re-indexing dragged entries and applying deferred updates.
    pub fn end_dragging(&mut self) {
        self.grid.end_dragging();
        self.dragging_nodes.clear();
        self.dragging_connections.clear();
    }

    /// Apply deferred grid updates now. A no-op when nothing is pending.
    pub fn flush_pending_updates(&mut self) {
        self.grid.flush_pending_updates();
    }

    /// Returns `true` while drag mode is active.
    pub fn is_dragging(&self) -> bool {
        self.grid.is_dragging()
    }

    // --- providers ---
    //
    // Every setter bumps the version.

    /// Use `order` to break ties between same-layer, same-z nodes.
    pub fn set_render_order(&mut self, order: impl RenderOrder + 'static) {
        self.render_order = Some(Box::new(order));
        self.touch();
    }

    /// Fall back to insertion order for ties.
    pub fn clear_render_order(&mut self) {
        self.render_order = None;
        self.touch();
    }

    /// Use `shapes` for point-in-node tests.
    pub fn set_node_shapes(&mut self, shapes: impl NodeShapes + 'static) {
        self.shapes = Some(Box::new(shapes));
        self.touch();
    }

    /// Test points against node bounding boxes.
    pub fn clear_node_shapes(&mut self) {
        self.shapes = None;
        self.touch();
    }

    /// Use `sizes` to size ports. Every port box is re-derived.
    pub fn set_port_sizes(&mut self, sizes: impl PortSizes + 'static) {
        self.port_sizes = Some(Box::new(sizes));
        self.reindex_all_ports();
    }

    /// Stop using a port size provider. Every port box is re-derived.
    pub fn clear_port_sizes(&mut self) {
        self.port_sizes = None;
        self.reindex_all_ports();
    }

    // --- change notification ---

    /// Monotonic counter bumped once per committed mutation or batch.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Call `listener` with the new version after every committed change.
    pub fn subscribe(&mut self, listener: impl FnMut(u64) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // --- lookups ---

    /// The node with `id`.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(|entry| &entry.node)
    }

    /// The connection with `id`.
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id).map(|entry| &entry.connection)
    }

    /// Derived geometry of a port.
    pub fn port(&self, port: &PortRef) -> Option<&PortRecord> {
        self.ports.get(port)
    }

    /// Segment boxes of a connection as last given to
    /// [`update_connection`](Self::update_connection).
    pub fn segments(&self, id: &ConnectionId) -> Option<&[Rect]> {
        self.connections.get(id).map(|entry| entry.segments.as_slice())
    }

    /// Connections with an endpoint on `node`, in no particular order.
    pub fn connections_for_node(&self, node: &NodeId) -> &[ConnectionId] {
        self.node_connections
            .get(node)
            .map_or(&[], |conns| conns.as_slice())
    }

    /// Iterate node records in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values().map(|entry| &entry.node)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Record and grid counters.
    pub fn stats(&self) -> SceneStats {
        SceneStats {
            nodes: self.nodes.len(),
            ports: self.ports.len(),
            connections: self.connections.len(),
            segments: self.connections.values().map(|e| e.segments.len()).sum(),
            cells: self.grid.cell_count(),
            pending: self.grid.pending_len(),
            rejected: self.grid.rejected_count(),
        }
    }

    /// Cross-check the record maps against the grid.
    pub fn diagnostics(&self) -> SceneDiagnostics {
        let mut unindexed_records = Vec::new();
        let mut stale_records = Vec::new();
        let mut check = |key: SpatialKey, bounds: Rect| {
            if self.grid.is_pending(&key) {
                return;
            }
            match self.grid.bounds(&key) {
                Some(indexed) if indexed != bounds => stale_records.push(key),
                Some(_) => {}
                None if is_indexable(bounds) => unindexed_records.push(key),
                None => {}
            }
        };
        for entry in self.nodes.values() {
            check(SpatialKey::Node(entry.node.id.clone()), entry.node.bounds);
        }
        for (port_ref, record) in &self.ports {
            check(SpatialKey::Port(port_ref.clone()), record.bounds);
        }
        for (id, entry) in &self.connections {
            for (i, bounds) in entry.segments.iter().enumerate() {
                check(SpatialKey::Segment(id.clone(), segment_index(i)), *bounds);
            }
        }

        let orphaned_entries = self
            .grid
            .iter()
            .map(|record| &record.key)
            .chain(self.grid.pending_keys())
            .filter(|key| !self.has_record(key))
            .cloned()
            .collect();

        SceneDiagnostics {
            grid: self.grid.diagnostics(),
            unindexed_records,
            orphaned_entries,
            stale_records,
        }
    }

    // --- internals ---

    pub(crate) fn stacking(&self, entry: &NodeEntry) -> Stacking {
        Stacking {
            layer: entry.node.layer,
            z_index: entry.node.z_index,
            paint: self
                .render_order
                .as_ref()
                .and_then(|order| order.paint_position(&entry.node.id)),
            seq: entry.seq,
        }
    }

    fn alloc_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn touch(&mut self) {
        if self.batch_depth > 0 {
            self.batch_dirty = true;
        } else {
            self.bump();
        }
    }

    fn bump(&mut self) {
        self.version += 1;
        let version = self.version;
        for listener in &mut self.listeners {
            listener(version);
        }
    }

    fn port_record(&self, node: &Node, port: &Port) -> PortRecord {
        let size = self
            .port_sizes
            .as_ref()
            .and_then(|sizes| sizes.port_size(node, port))
            .or(port.size)
            .unwrap_or(self.config.port_size);
        let center = node.port_center(port);
        let snap = self.config.snap_distance;
        PortRecord {
            node: node.id.clone(),
            port: port.id.clone(),
            is_output: port.is_output,
            center,
            bounds: Rect::from_center_size(center, size).inflate(snap, snap),
        }
    }

    fn index_node(&mut self, node: &Node, old_ports: &[PortId]) {
        let dragged = self.dragging_nodes.contains(&node.id);
        self.grid.insert(SpatialRecord {
            key: SpatialKey::Node(node.id.clone()),
            bounds: node.bounds,
        });

        for old in old_ports {
            if node.port(old).is_none() {
                let port_ref = PortRef {
                    node: node.id.clone(),
                    port: old.clone(),
                };
                self.ports.remove(&port_ref);
                self.grid.remove(&SpatialKey::Port(port_ref));
            }
        }

        let records: Vec<PortRecord> = node
            .ports
            .iter()
            .map(|port| self.port_record(node, port))
            .collect();
        for record in records {
            let port_ref = PortRef {
                node: record.node.clone(),
                port: record.port.clone(),
            };
            let key = SpatialKey::Port(port_ref.clone());
            if dragged {
                self.grid.add_dragging(key.clone());
            }
            self.grid.insert(SpatialRecord {
                key,
                bounds: record.bounds,
            });
            self.ports.insert(port_ref, record);
        }
    }

    fn reindex_all_ports(&mut self) {
        let nodes: Vec<Node> = self.nodes.values().map(|entry| entry.node.clone()).collect();
        for node in &nodes {
            let ids: Vec<PortId> = node.ports.iter().map(|p| p.id.clone()).collect();
            self.index_node(node, &ids);
        }
        self.touch();
    }

    fn remove_segments(&mut self, id: &ConnectionId, count: usize) {
        for i in 0..count {
            self.grid
                .remove(&SpatialKey::Segment(id.clone(), segment_index(i)));
        }
    }

    fn link_adjacency(&mut self, connection: &Connection) {
        for node in [&connection.source, &connection.target] {
            let conns = self.node_connections.entry(node.clone()).or_default();
            if !conns.contains(&connection.id) {
                conns.push(connection.id.clone());
            }
        }
    }

    fn unlink_adjacency(&mut self, connection: &Connection) {
        for node in [&connection.source, &connection.target] {
            if let Some(conns) = self.node_connections.get_mut(node) {
                conns.retain(|c| c != &connection.id);
                if conns.is_empty() {
                    self.node_connections.remove(node);
                }
            }
        }
    }

    fn has_record(&self, key: &SpatialKey) -> bool {
        match key {
            SpatialKey::Node(id) => self.nodes.contains_key(id),
            SpatialKey::Port(port_ref) => self.ports.contains_key(port_ref),
            SpatialKey::Segment(id, i) => self
                .connections
                .get(id)
                .is_some_and(|entry| usize::try_from(*i).is_ok_and(|i| i < entry.segments.len())),
        }
    }
}
