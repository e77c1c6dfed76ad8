// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-connection cache of drawn paths and hit paths.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use kurbo::{BezPath, Point, Rect};
use nodeflow_scene::{Connection, ConnectionHitTester, ConnectionId, Node};

use crate::{ConnectionStyle, Endpoints, HitPath, PathError};

/// Hit and miss counters for [`ConnectionPathCache::get_or_create_path`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Requests that built a new entry.
    pub misses: u64,
}

/// The values an entry was built from. An entry is fresh iff these match.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PathInputs {
    source_origin: Point,
    target_origin: Point,
    start_gap: f64,
    end_gap: f64,
    ends: Endpoints,
}

impl PathInputs {
    fn new(source: &Node, target: &Node, style: &ConnectionStyle, ends: Endpoints) -> Self {
        Self {
            source_origin: source.bounds.origin(),
            target_origin: target.bounds.origin(),
            start_gap: style.start_gap,
            end_gap: style.end_gap,
            ends,
        }
    }

    /// Returns `true` if neither node nor either port has moved.
    fn same_positions(&self, source: &Node, target: &Node, current: &Endpoints) -> bool {
        self.source_origin == source.bounds.origin()
            && self.target_origin == target.bounds.origin()
            && self.ends.source_anchor == current.source_anchor
            && self.ends.target_anchor == current.target_anchor
    }
}

#[derive(Clone, Debug)]
struct CachedPath {
    inputs: PathInputs,
    style: ConnectionStyle,
    path: BezPath,
    hit_path: HitPath,
}

impl CachedPath {
    fn build(inputs: PathInputs, style: ConnectionStyle) -> Self {
        let path = style.build_path(&inputs.ends);
        let hit_path = HitPath::new(&path, style.hit_radius());
        Self {
            inputs,
            style,
            path,
            hit_path,
        }
    }
}

/// Caches the drawn path and the hit path of each connection.
///
/// Only [`get_or_create_path`](Self::get_or_create_path) (and
/// [`segments_for`](Self::segments_for), which calls it) creates or refreshes
/// entries. [`hit_test`](Self::hit_test) is read-only: a connection whose
/// endpoints moved since its entry was built does not hit until the entry is
/// refreshed.
#[derive(Default)]
pub struct ConnectionPathCache {
    entries: HashMap<ConnectionId, CachedPath>,
    stats: CacheStats,
}

impl fmt::Debug for ConnectionPathCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPathCache")
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl ConnectionPathCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The drawn path for `connection`, rebuilding it if any input changed.
    ///
    /// Inputs are the two node origins, both port anchors, the gaps, and the
    /// rest of `style`. Fails if `source` or `target` do not fit the connection.
    pub fn get_or_create_path(
        &mut self,
        connection: &Connection,
        source: &Node,
        target: &Node,
        style: &ConnectionStyle,
    ) -> Result<&BezPath, PathError> {
        self.refresh(connection, source, target, style)
            .map(|entry| &entry.path)
    }

    /// Refresh the entry for `connection` and return its segment boxes, ready
    /// for [`SceneIndex::update_connection`](nodeflow_scene::SceneIndex::update_connection).
    pub fn segments_for(
        &mut self,
        connection: &Connection,
        source: &Node,
        target: &Node,
        style: &ConnectionStyle,
    ) -> Result<Vec<Rect>, PathError> {
        let entry = self.refresh(connection, source, target, style)?;
        Ok(entry.hit_path.segment_bounds(entry.style.segment_lines))
    }

    /// Returns `true` if `point` is on the cached stroke of `connection`.
    ///
    /// Never creates or repairs an entry. Returns `false` when there is no
    /// entry, when a node or port moved since the entry was built, or when the
    /// endpoints do not fit the connection. With `tolerance`, the cached
    /// centerline is tested against that tolerance instead of the style's.
    pub fn hit_test(
        &self,
        connection: &Connection,
        source: &Node,
        target: &Node,
        point: Point,
        tolerance: Option<f64>,
    ) -> bool {
        let Some(entry) = self.entries.get(&connection.id) else {
            return false;
        };
        let Ok(current) = Endpoints::resolve(connection, source, target, &entry.style) else {
            return false;
        };
        if !entry.inputs.same_positions(source, target, &current) {
            return false;
        }
        match tolerance {
            None => entry.hit_path.contains(point),
            Some(tolerance) => entry
                .hit_path
                .contains_within(point, entry.style.hit_radius_with(tolerance)),
        }
    }

    /// The cached drawn path, possibly stale.
    pub fn path(&self, id: &ConnectionId) -> Option<&BezPath> {
        self.entries.get(id).map(|entry| &entry.path)
    }

    /// The cached hit path, possibly stale.
    pub fn hit_path(&self, id: &ConnectionId) -> Option<&HitPath> {
        self.entries.get(id).map(|entry| &entry.hit_path)
    }

    /// Segment boxes of the cached hit path, possibly stale.
    pub fn segment_bounds(&self, id: &ConnectionId) -> Option<Vec<Rect>> {
        self.entries
            .get(id)
            .map(|entry| entry.hit_path.segment_bounds(entry.style.segment_lines))
    }

    /// Drop every entry. Call after a style change that affects geometry.
    pub fn invalidate_all(&mut self) {
        log::trace!("invalidating {} cached connection paths", self.entries.len());
        self.entries.clear();
    }

    /// Drop the entry for `id`. Returns `true` if there was one.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Drop every entry and reset the counters.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }

    /// Returns `true` if there is an entry for `id`, fresh or not.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit and miss counters since construction or the last [`clear_all`](Self::clear_all).
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn refresh(
        &mut self,
        connection: &Connection,
        source: &Node,
        target: &Node,
        style: &ConnectionStyle,
    ) -> Result<&CachedPath, PathError> {
        let ends = Endpoints::resolve(connection, source, target, style)?;
        let inputs = PathInputs::new(source, target, style, ends);
        match self.entries.entry(connection.id.clone()) {
            Entry::Occupied(slot) if slot.get().inputs == inputs && slot.get().style == *style => {
                self.stats.hits += 1;
                Ok(&*slot.into_mut())
            }
            Entry::Occupied(mut slot) => {
                self.stats.misses += 1;
                log::trace!("rebuilding path for {:?}", connection.id);
                slot.insert(CachedPath::build(inputs, *style));
                Ok(&*slot.into_mut())
            }
            Entry::Vacant(slot) => {
                self.stats.misses += 1;
                log::trace!("building path for {:?}", connection.id);
                Ok(&*slot.insert(CachedPath::build(inputs, *style)))
            }
        }
    }
}

impl ConnectionHitTester for ConnectionPathCache {
    fn hit_connection(
        &self,
        connection: &Connection,
        source: &Node,
        target: &Node,
        point: Point,
    ) -> bool {
        self.hit_test(connection, source, target, point, None)
    }
}
