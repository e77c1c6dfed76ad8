// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The uniform grid itself: storage, incremental updates, drag batching, queries.

use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt::Debug;

use hashbrown::{HashMap, HashSet};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::cell::{CellCoord, CellRange};
use crate::scan::{scan_point, scan_rect};
use crate::spatial::{Spatial, contains_point, is_indexable, overlaps};

/// Tuning knobs for [`SpatialGrid`].
///
/// None of these affect query results; they only trade memory for speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    /// Side length of a square cell in world units.
    pub cell_size: f64,
    /// Below this many indexed items, queries scan linearly instead of visiting cells.
    ///
    /// Set to `0` to always use the cells.
    pub linear_scan_threshold: usize,
    /// Cache the last [`SpatialGrid::query`] result.
    pub query_cache: bool,
    /// Maximum per-edge difference for two query rectangles to share a cached result.
    pub query_cache_tolerance: f64,
    /// During drag mode, flush deferred updates once this many have accumulated.
    pub pending_flush_threshold: usize,
    /// Items covering more cells than this are kept on a side list that every
    /// query scans, instead of being linked into each cell.
    pub max_cells_per_item: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 256.0,
            linear_scan_threshold: 20,
            query_cache: true,
            query_cache_tolerance: 1e-6,
            pending_flush_threshold: 256,
            max_cells_per_item: 4096,
        }
    }
}

impl GridConfig {
    /// Set the cell size. Non-finite or non-positive sizes fall back to the default.
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            Self::default().cell_size
        };
        self
    }

    /// Set the linear-scan threshold.
    pub fn with_linear_scan_threshold(mut self, threshold: usize) -> Self {
        self.linear_scan_threshold = threshold;
        self
    }

    /// Enable or disable the query result cache.
    pub fn with_query_cache(mut self, enabled: bool) -> Self {
        self.query_cache = enabled;
        self
    }

    /// Set the drag-mode auto-flush threshold.
    pub fn with_pending_flush_threshold(mut self, threshold: usize) -> Self {
        self.pending_flush_threshold = threshold.max(1);
        self
    }

    /// Set the cell count above which an item is stored as oversized.
    pub fn with_max_cells_per_item(mut self, max_cells: u64) -> Self {
        self.max_cells_per_item = max_cells.max(1);
        self
    }
}

/// Consistency report between the item map and cell membership.
///
/// All vectors are empty for a healthy grid. See [`SpatialGrid::diagnostics`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridDiagnostics<K> {
    /// Items stored in the grid but referenced by no cell.
    pub unindexed: Vec<K>,
    /// Keys referenced by cells with no stored item.
    pub orphaned: Vec<K>,
    /// Items whose referencing cells differ from the cells their bounds cover.
    pub misplaced: Vec<K>,
    /// Deferred updates still waiting for a flush.
    pub pending: usize,
}

impl<K> GridDiagnostics<K> {
    /// Returns `true` if cell membership matches the item map exactly.
    pub fn is_consistent(&self) -> bool {
        self.unindexed.is_empty() && self.orphaned.is_empty() && self.misplaced.is_empty()
    }
}

#[derive(Debug)]
struct Entry<T> {
    item: T,
    bounds: Rect,
    /// `None` for oversized items.
    cells: Option<CellRange>,
}

#[derive(Debug)]
struct CachedQuery<K> {
    rect: Rect,
    keys: Vec<K>,
}

type CellMembers<K> = SmallVec<[K; 4]>;

/// Uniform-grid spatial hash.
///
/// Each item is stored once and referenced from every cell its bounding box
/// covers. Updates are incremental: re-inserting an item touches only the cells
/// it leaves or enters.
///
/// ## Drag mode
///
/// Between [`start_dragging`](Self::start_dragging) and
/// [`end_dragging`](Self::end_dragging), inserts for the dragged keys apply
/// immediately while inserts for every other key are parked in a pending set.
/// The pending set is applied by [`flush_pending_updates`](Self::flush_pending_updates),
/// when it reaches [`GridConfig::pending_flush_threshold`], or when the drag ends.
/// Queries do not see parked updates.
///
/// ## Degenerate boxes
///
/// Boxes with a non-finite edge or a non-positive extent are not indexed. An
/// item that had been indexed is dropped from the cells when it turns
/// degenerate. Rejections are counted in [`rejected_count`](Self::rejected_count).
///
/// ## Oversized boxes
///
/// A finite box can still span millions of cells. Items covering more than
/// [`GridConfig::max_cells_per_item`] cells are not linked into cells at all;
/// they sit on a side list that every cell query checks linearly.
pub struct SpatialGrid<T: Spatial> {
    config: GridConfig,
    items: HashMap<T::Key, Entry<T>>,
    cells: HashMap<CellCoord, CellMembers<T::Key>>,
    oversized: HashSet<T::Key>,
    pending: HashMap<T::Key, T>,
    dragging: HashSet<T::Key>,
    drag_active: bool,
    rejected: u64,
    last_query: RefCell<Option<CachedQuery<T::Key>>>,
}

impl<T: Spatial> Debug for SpatialGrid<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpatialGrid")
            .field("config", &self.config)
            .field("items", &self.items.len())
            .field("cells", &self.cells.len())
            .field("oversized", &self.oversized.len())
            .field("pending", &self.pending.len())
            .field("dragging", &self.dragging.len())
            .field("drag_active", &self.drag_active)
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}

impl<T: Spatial> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Spatial> SpatialGrid<T> {
    /// Create an empty grid with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GridConfig::default())
    }

    /// Create an empty grid with `config`.
    pub fn with_config(config: GridConfig) -> Self {
        Self {
            config: config.with_cell_size(config.cell_size),
            items: HashMap::new(),
            cells: HashMap::new(),
            oversized: HashSet::new(),
            pending: HashMap::new(),
            dragging: HashSet::new(),
            drag_active: false,
            rejected: 0,
            last_query: RefCell::new(None),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Insert `item`, or replace the item with the same key.
    ///
    /// Re-inserting an unchanged item leaves cell membership untouched. During
    /// drag mode, items whose key is not being dragged are deferred.
    pub fn insert(&mut self, item: T) {
        let key = item.key();
        if self.drag_active && !self.dragging.contains(&key) {
            self.pending.insert(key, item);
            if self.pending.len() >= self.config.pending_flush_threshold {
                self.flush_pending_updates();
            }
            return;
        }
        // A direct insert supersedes anything parked for the same key.
        self.pending.remove(&key);
        self.apply(key, item);
    }

    /// Remove the item with `key`, including any deferred update for it.
    ///
    /// Returns the indexed item if there was one. Missing keys are a no-op.
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        let parked = self.pending.remove(key);
        let removed = self.unlink_entry(key).map(|entry| entry.item);
        if removed.is_some() || parked.is_some() {
            self.invalidate_query_cache();
        }
        removed.or(parked)
    }

    /// Remove everything, including deferred updates and drag state.
    pub fn clear(&mut self) {
        self.items.clear();
        self.cells.clear();
        self.oversized.clear();
        self.pending.clear();
        self.dragging.clear();
        self.drag_active = false;
        self.invalidate_query_cache();
    }

    /// Enter drag mode for `keys`. An active drag is ended first.
    pub fn start_dragging<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = T::Key>,
    {
        if self.drag_active {
            self.end_dragging();
        }
        self.dragging.extend(keys);
        self.drag_active = true;
        log::trace!("grid drag started with {} keys", self.dragging.len());
    }

    /// Add `key` to the active drag set. Does nothing outside drag mode.
    ///
    /// A deferred update already parked for `key` is applied immediately.
    pub fn add_dragging(&mut self, key: T::Key) {
        if !self.drag_active {
            return;
        }
        if let Some(item) = self.pending.remove(&key) {
            self.apply(key.clone(), item);
        }
        self.dragging.insert(key);
    }

    /// Leave drag mode.
    ///
    /// Re-indexes every dragged key from its stored item, applies all deferred
    /// updates, and invalidates the query cache.
    pub fn end_dragging(&mut self) {
        if !self.drag_active {
            return;
        }
        self.drag_active = false;
        let dragged: Vec<T::Key> = self.dragging.drain().collect();
        for key in dragged {
            if let Some(entry) = self.unlink_entry(&key) {
                self.apply(key, entry.item);
            }
        }
        self.flush_pending_updates();
        self.invalidate_query_cache();
        log::trace!("grid drag ended");
    }

    /// Apply all deferred updates now. A no-op when nothing is pending.
    pub fn flush_pending_updates(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        log::trace!("flushing {} deferred grid updates", self.pending.len());
        let pending: Vec<(T::Key, T)> = self.pending.drain().collect();
        for (key, item) in pending {
            self.apply(key, item);
        }
    }

    /// Returns `true` while drag mode is active.
    pub fn is_dragging(&self) -> bool {
        self.drag_active
    }

    /// Returns `true` if `key` is in the active drag set.
    pub fn is_dragging_key(&self, key: &T::Key) -> bool {
        self.drag_active && self.dragging.contains(key)
    }

    /// Items whose box overlaps `rect`.
    ///
    /// The result set equals a brute-force [`overlaps`] filter over every
    /// indexed item; order is unspecified.
    pub fn query(&self, rect: Rect) -> Vec<&T> {
        if self.config.query_cache
            && let Some(hit) = self.cached_query(rect)
        {
            return hit;
        }
        let out = if !is_queryable(rect) {
            Vec::new()
        } else if self.prefer_linear_scan(CellRange::covering(rect, self.config.cell_size)) {
            scan_rect(self.entries(), rect)
        } else {
            self.collect_cells(CellRange::covering(rect, self.config.cell_size), |bounds| {
                overlaps(bounds, rect)
            })
        };
        if self.config.query_cache {
            *self.last_query.borrow_mut() = Some(CachedQuery {
                rect,
                keys: out.iter().map(|item| item.key()).collect(),
            });
        }
        out
    }

    /// Items whose box, grown by `radius` on every side, contains `pt`.
    pub fn query_point(&self, pt: Point, radius: f64) -> Vec<&T> {
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        if !(pt.x.is_finite() && pt.y.is_finite()) {
            return Vec::new();
        }
        let probe = Rect::new(pt.x - radius, pt.y - radius, pt.x + radius, pt.y + radius);
        let range = CellRange::covering(probe, self.config.cell_size);
        if self.prefer_linear_scan(range) {
            scan_point(self.entries(), pt, radius)
        } else {
            self.collect_cells(range, |bounds| contains_point(bounds, pt, radius))
        }
    }

    /// The indexed item for `key`, if any. Deferred updates are not visible here.
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.get(key).map(|entry| &entry.item)
    }

    /// The bounds `key` is currently indexed under.
    pub fn bounds(&self, key: &T::Key) -> Option<Rect> {
        self.items.get(key).map(|entry| entry.bounds)
    }

    /// Returns `true` if `key` is indexed.
    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.items.contains_key(key)
    }

    /// Returns `true` if an update for `key` is waiting in the pending set.
    pub fn is_pending(&self, key: &T::Key) -> bool {
        self.pending.contains_key(key)
    }

    /// Iterate indexed items in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.values().map(|entry| &entry.item)
    }

    /// Keys with a deferred update.
    pub fn pending_keys(&self) -> impl Iterator<Item = &T::Key> + '_ {
        self.pending.keys()
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of deferred updates.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of inserts rejected for degenerate bounds since construction.
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Number of items stored on the oversized side list.
    pub fn oversized_count(&self) -> usize {
        self.oversized.len()
    }

    /// Cells that currently reference `key`, sorted. Empty for oversized items.
    ///
    /// This walks every cell and is meant for tests and debugging.
    pub fn cells_of(&self, key: &T::Key) -> Vec<CellCoord> {
        let mut out: Vec<CellCoord> = self
            .cells
            .iter()
            .filter(|(_, members)| members.contains(key))
            .map(|(cell, _)| *cell)
            .collect();
        out.sort_unstable();
        out
    }

    /// Compare cell membership against the item map.
    ///
    /// Expected cells are recomputed from each item's stored bounds, so drift in
    /// the cached cell range is reported too.
    pub fn diagnostics(&self) -> GridDiagnostics<T::Key> {
        let mut seen: HashMap<&T::Key, Vec<CellCoord>> = HashMap::new();
        let mut orphaned: HashSet<&T::Key> = HashSet::new();
        for (cell, members) in &self.cells {
            for key in members {
                if self.items.contains_key(key) {
                    seen.entry(key).or_default().push(*cell);
                } else {
                    orphaned.insert(key);
                }
            }
        }
        orphaned.extend(self.oversized.iter().filter(|key| !self.items.contains_key(*key)));

        let mut unindexed = Vec::new();
        let mut misplaced = Vec::new();
        for (key, entry) in &self.items {
            let expected = CellRange::covering(entry.bounds, self.config.cell_size);
            let should_be_oversized = expected.cell_count() > self.config.max_cells_per_item;
            if entry.cells.is_none() || self.oversized.contains(key) {
                if !self.oversized.contains(key) {
                    unindexed.push(key.clone());
                } else if seen.contains_key(key) || !should_be_oversized || entry.cells.is_some() {
                    misplaced.push(key.clone());
                }
                continue;
            }
            let Some(cells) = seen.get(key) else {
                unindexed.push(key.clone());
                continue;
            };
            let exact = u64::try_from(cells.len()).is_ok_and(|n| n == expected.cell_count())
                && cells.iter().all(|cell| expected.contains(*cell));
            if !exact {
                misplaced.push(key.clone());
            }
        }

        GridDiagnostics {
            unindexed,
            orphaned: orphaned.into_iter().cloned().collect(),
            misplaced,
            pending: self.pending.len(),
        }
    }

    // --- internals ---

    fn apply(&mut self, key: T::Key, item: T) {
        let bounds = item.bounds();
        if !is_indexable(bounds) {
            self.rejected += 1;
            log::debug!("not indexing {key:?}: degenerate bounds {bounds:?}");
            if self.unlink_entry(&key).is_some() {
                self.invalidate_query_cache();
            }
            return;
        }
        let range = CellRange::covering(bounds, self.config.cell_size);
        let placement = if range.cell_count() > self.config.max_cells_per_item {
            log::debug!("{key:?} covers {} cells; storing as oversized", range.cell_count());
            None
        } else {
            Some(range)
        };
        match self.items.get_mut(&key) {
            Some(entry) => {
                if entry.cells != placement {
                    unplace(&mut self.cells, &mut self.oversized, entry.cells, &key);
                    place(&mut self.cells, &mut self.oversized, placement, &key);
                }
                entry.item = item;
                entry.bounds = bounds;
                entry.cells = placement;
            }
            None => {
                place(&mut self.cells, &mut self.oversized, placement, &key);
                self.items.insert(
                    key,
                    Entry {
                        item,
                        bounds,
                        cells: placement,
                    },
                );
            }
        }
        self.invalidate_query_cache();
    }

    fn unlink_entry(&mut self, key: &T::Key) -> Option<Entry<T>> {
        let entry = self.items.remove(key)?;
        unplace(&mut self.cells, &mut self.oversized, entry.cells, key);
        Some(entry)
    }

    fn entries(&self) -> impl Iterator<Item = (Rect, &T)> + '_ {
        self.items.values().map(|entry| (entry.bounds, &entry.item))
    }

    fn prefer_linear_scan(&self, range: CellRange) -> bool {
        self.items.len() < self.config.linear_scan_threshold
            || range.cell_count() > u64::try_from(self.cells.len()).unwrap_or(u64::MAX)
    }

    fn collect_cells(&self, range: CellRange, mut accept: impl FnMut(Rect) -> bool) -> Vec<&T> {
        let mut seen: HashSet<&T::Key> = HashSet::new();
        let mut out = Vec::new();
        for cell in range.iter() {
            let Some(members) = self.cells.get(&cell) else {
                continue;
            };
            for key in members {
                if !seen.insert(key) {
                    continue;
                }
                if let Some(entry) = self.items.get(key)
                    && accept(entry.bounds)
                {
                    out.push(&entry.item);
                }
            }
        }
        for key in &self.oversized {
            if let Some(entry) = self.items.get(key)
                && accept(entry.bounds)
            {
                out.push(&entry.item);
            }
        }
        out
    }

    fn cached_query(&self, rect: Rect) -> Option<Vec<&T>> {
        let cache = self.last_query.borrow();
        let cached = cache.as_ref()?;
        let tol = self.config.query_cache_tolerance;
        let close = (cached.rect.x0 - rect.x0).abs() <= tol
            && (cached.rect.y0 - rect.y0).abs() <= tol
            && (cached.rect.x1 - rect.x1).abs() <= tol
            && (cached.rect.y1 - rect.y1).abs() <= tol;
        if !close {
            return None;
        }
        cached
            .keys
            .iter()
            .map(|key| self.items.get(key).map(|entry| &entry.item))
            .collect()
    }

    fn invalidate_query_cache(&self) {
        self.last_query.borrow_mut().take();
    }
}

fn is_queryable(rect: Rect) -> bool {
    rect.x0.is_finite()
        && rect.y0.is_finite()
        && rect.x1.is_finite()
        && rect.y1.is_finite()
        && rect.x0 < rect.x1
        && rect.y0 < rect.y1
}

fn link<K: Clone + Eq + core::hash::Hash>(
    cells: &mut HashMap<CellCoord, CellMembers<K>>,
    range: CellRange,
    key: &K,
) {
    for cell in range.iter() {
        cells.entry(cell).or_default().push(key.clone());
    }
}

fn place<K: Clone + Eq + core::hash::Hash>(
    cells: &mut HashMap<CellCoord, CellMembers<K>>,
    oversized: &mut HashSet<K>,
    placement: Option<CellRange>,
    key: &K,
) {
    match placement {
        Some(range) => link(cells, range, key),
        None => {
            oversized.insert(key.clone());
        }
    }
}

fn unplace<K: Eq + core::hash::Hash>(
    cells: &mut HashMap<CellCoord, CellMembers<K>>,
    oversized: &mut HashSet<K>,
    placement: Option<CellRange>,
    key: &K,
) {
    match placement {
        Some(range) => unlink(cells, range, key),
        None => {
            oversized.remove(key);
        }
    }
}

fn unlink<K: Eq + core::hash::Hash>(
    cells: &mut HashMap<CellCoord, CellMembers<K>>,
    range: CellRange,
    key: &K,
) {
    for cell in range.iter() {
        if let Some(members) = cells.get_mut(&cell) {
            members.retain(|k| k != key);
            if members.is_empty() {
                cells.remove(&cell);
            }
        }
    }
}
