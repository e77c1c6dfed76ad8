// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point and rectangle queries over a [`SceneIndex`].

use alloc::vec::Vec;

use hashbrown::HashSet;
use kurbo::{Point, Rect, Shape};
use nodeflow_grid::contains_point;

use crate::hit::{HitResult, HitTarget, PortHit, Stacking};
use crate::index::{ConnectionEntry, NodeEntry, PortRecord, SceneIndex, SpatialKey, SpatialRecord};
use crate::providers::ConnectionHitTester;
use crate::types::{Connection, ConnectionId, Node, NodeId, RenderLayer};

/// A port under consideration, with its center as currently indexed.
struct PortCandidate<'a> {
    center: Point,
    port: &'a PortRecord,
}

impl SceneIndex {
    /// Resolve what is under `point`.
    ///
    /// Candidates are tried in paint order from the top down:
    ///
    /// 1. foreground nodes,
    /// 2. ports (nearest center first),
    /// 3. middle-layer nodes,
    /// 4. connections (latest first),
    /// 5. background nodes.
    ///
    /// Within a layer the topmost node wins. Ports are skipped while another
    /// node is painted over their center. Connections are matched on segment
    /// boxes alone; use [`hit_test_with`](Self::hit_test_with) to confirm them
    /// against the rendered stroke.
    pub fn hit_test(&self, point: Point) -> HitResult {
        self.resolve(point, None)
    }

    /// Like [`hit_test`](Self::hit_test), but a connection only matches if
    /// `connections` confirms the point is on its stroke.
    pub fn hit_test_with(&self, point: Point, connections: &dyn ConnectionHitTester) -> HitResult {
        self.resolve(point, Some(connections))
    }

    /// The port nearest to `point` among those whose snap box contains it.
    ///
    /// Ports of invisible or unpickable nodes, and ports covered by another
    /// node, are skipped. Ties on distance go to the port whose node is on top,
    /// then to the port declared first on its node.
    pub fn hit_test_port(&self, point: Point) -> Option<PortHit> {
        let candidates = self
            .grid
            .query_point(point, 0.0)
            .into_iter()
            .filter_map(|record| self.port_candidate(record))
            .collect();
        self.pick_port(point, candidates)
    }

    /// Visible nodes whose box, grown by `radius`, contains `point`. Topmost first.
    pub fn nodes_at(&self, point: Point, radius: f64) -> Vec<NodeId> {
        self.rank_nodes(self.grid.query_point(point, radius))
    }

    /// Visible nodes whose box overlaps `rect`. Topmost first.
    pub fn nodes_in(&self, rect: Rect) -> Vec<NodeId> {
        self.rank_nodes(self.grid.query(rect))
    }

    /// Connections with a segment box within `radius` of `point`.
    ///
    /// Each connection appears once, latest inserted first. Connections with a
    /// missing or invisible endpoint are left out.
    pub fn connections_at(&self, point: Point, radius: f64) -> Vec<ConnectionId> {
        self.live_connections(self.grid.query_point(point, radius))
            .into_iter()
            .map(|entry| entry.connection.id.clone())
            .collect()
    }

    /// Like [`connections_at`](Self::connections_at), keeping only connections
    /// that `tester` confirms at `point`.
    pub fn connections_at_with(
        &self,
        point: Point,
        radius: f64,
        tester: &dyn ConnectionHitTester,
    ) -> Vec<ConnectionId> {
        self.live_connections(self.grid.query_point(point, radius))
            .into_iter()
            .filter(|entry| {
                self.live_endpoints(&entry.connection)
                    .is_some_and(|(s, t)| tester.hit_connection(&entry.connection, s, t, point))
            })
            .map(|entry| entry.connection.id.clone())
            .collect()
    }

    /// Connections with a segment box overlapping `rect`, latest inserted first.
    pub fn connections_in(&self, rect: Rect) -> Vec<ConnectionId> {
        self.live_connections(self.grid.query(rect))
            .into_iter()
            .map(|entry| entry.connection.id.clone())
            .collect()
    }

    fn resolve(&self, point: Point, tester: Option<&dyn ConnectionHitTester>) -> HitResult {
        let mut nodes: Vec<(Stacking, &NodeId)> = Vec::new();
        let mut ports: Vec<PortCandidate<'_>> = Vec::new();
        let mut segments: Vec<&SpatialRecord> = Vec::new();
        for record in self.grid.query_point(point, 0.0) {
            match &record.key {
                SpatialKey::Node(id) => {
                    if let Some(entry) = self.nodes.get(id)
                        && entry.node.is_pickable()
                        && self.node_contains(&entry.node, record.bounds, point)
                    {
                        nodes.push((self.stacking(entry), &entry.node.id));
                    }
                }
                SpatialKey::Port(_) => ports.extend(self.port_candidate(record)),
                SpatialKey::Segment(..) => segments.push(record),
            }
        }
        nodes.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        let topmost = |layer: RenderLayer| {
            nodes
                .iter()
                .find(|(stacking, _)| stacking.layer == layer)
                .map(|(_, id)| HitResult::new(HitTarget::Node((*id).clone()), point))
        };

        if let Some(hit) = topmost(RenderLayer::Foreground) {
            return hit;
        }
        if let Some(port) = self.pick_port(point, ports) {
            return HitResult::new(HitTarget::Port(port), point);
        }
        if let Some(hit) = topmost(RenderLayer::Middle) {
            return hit;
        }
        for entry in self.live_connections(segments) {
            let confirmed = match tester {
                Some(tester) => self.live_endpoints(&entry.connection).is_some_and(
                    |(source, target)| tester.hit_connection(&entry.connection, source, target, point),
                ),
                None => true,
            };
            if confirmed {
                return HitResult::new(HitTarget::Connection(entry.connection.id.clone()), point);
            }
        }
        if let Some(hit) = topmost(RenderLayer::Background) {
            return hit;
        }
        HitResult::new(HitTarget::Canvas, point)
    }

    /// The port behind a grid record, centered where the grid has it indexed.
    ///
    /// While a node update is deferred the record already holds the new
    /// geometry, so the center is shifted back onto the indexed snap box.
    fn port_candidate<'a>(&'a self, record: &SpatialRecord) -> Option<PortCandidate<'a>> {
        let SpatialKey::Port(port_ref) = &record.key else {
            return None;
        };
        let port = self.ports.get(port_ref)?;
        let center = port.center + (record.bounds.center() - port.bounds.center());
        Some(PortCandidate { center, port })
    }

    fn pick_port(&self, point: Point, candidates: Vec<PortCandidate<'_>>) -> Option<PortHit> {
        let mut scored: Vec<(f64, Stacking, usize, PortCandidate<'_>)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let owner = self.nodes.get(&candidate.port.node)?;
                if !owner.node.is_pickable() {
                    return None;
                }
                let declared = owner
                    .node
                    .ports
                    .iter()
                    .position(|p| p.id == candidate.port.port)
                    .unwrap_or(usize::MAX);
                Some((
                    candidate.center.distance(point),
                    self.stacking(owner),
                    declared,
                    candidate,
                ))
            })
            .collect();
        scored.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(&b.2))
        });
        scored
            .into_iter()
            .find(|(_, stacking, _, candidate)| {
                !self.is_covered(candidate.center, &candidate.port.node, *stacking)
            })
            .map(|(distance, _, _, candidate)| PortHit {
                node: candidate.port.node.clone(),
                port: candidate.port.port.clone(),
                is_output: candidate.port.is_output,
                center: candidate.center,
                distance,
            })
    }

    /// Returns `true` if a visible node other than `owner`, stacked above it,
    /// paints over `center`.
    fn is_covered(&self, center: Point, owner: &NodeId, owner_stacking: Stacking) -> bool {
        self.grid
            .query_point(center, 0.0)
            .into_iter()
            .any(|record| match &record.key {
                SpatialKey::Node(id) if id != owner => self.nodes.get(id).is_some_and(|entry| {
                    entry.node.is_visible()
                        && self.stacking(entry) > owner_stacking
                        && self.node_contains(&entry.node, record.bounds, center)
                }),
                _ => false,
            })
    }

    /// Point-in-node test against `indexed`, the box the grid currently holds
    /// for `node`. A custom shape is moved along with the box.
    fn node_contains(&self, node: &Node, indexed: Rect, point: Point) -> bool {
        match self.shapes.as_ref().and_then(|shapes| shapes.hit_shape(node)) {
            Some(shape) => shape.contains(point + (node.bounds.origin() - indexed.origin())),
            None => contains_point(indexed, point, 0.0),
        }
    }

    fn rank_nodes(&self, records: Vec<&SpatialRecord>) -> Vec<NodeId> {
        let mut hits: Vec<(Stacking, &NodeId)> = records
            .into_iter()
            .filter_map(|record| match &record.key {
                SpatialKey::Node(id) => self.nodes.get(id),
                _ => None,
            })
            .filter(|entry: &&NodeEntry| entry.node.is_visible())
            .map(|entry| (self.stacking(entry), &entry.node.id))
            .collect();
        hits.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        hits.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Deduplicated, live connections behind `records`, latest inserted first.
    fn live_connections(&self, records: Vec<&SpatialRecord>) -> Vec<&ConnectionEntry> {
        let mut seen: HashSet<&ConnectionId> = HashSet::new();
        let mut out: Vec<&ConnectionEntry> = records
            .into_iter()
            .filter_map(|record| match &record.key {
                SpatialKey::Segment(id, _) if seen.insert(id) => self.connections.get(id),
                _ => None,
            })
            .filter(|entry| self.live_endpoints(&entry.connection).is_some())
            .collect();
        out.sort_unstable_by(|a, b| b.seq.cmp(&a.seq));
        out
    }

    /// Both endpoint nodes, if both exist and are visible.
    fn live_endpoints(&self, connection: &Connection) -> Option<(&Node, &Node)> {
        let source = self.node(&connection.source)?;
        let target = self.node(&connection.target)?;
        (source.is_visible() && target.is_visible()).then_some((source, target))
    }
}
