//! Layered rectangle index for hit-testing.
//!
//! The drag-drop coordinator needs to answer one question on every pointer
//! move: *which registered drop target is on top at this point?*  Instead of
//! asking a rendering engine, targets register their bounding rectangle and a
//! stacking `layer` here.
//!
//! # Ordering rules
//!
//! Among all entries containing the point, the one with the highest `layer`
//! wins.  Ties are broken by insertion order: the most recently inserted
//! entry is considered on top, matching how a later-mounted element paints
//! over an earlier sibling.
//!
//! Lookups are a linear scan.  Desktop shells rarely have more than a few
//! dozen live targets; see `benches/hit_test_bench.rs` for the numbers.

use std::collections::HashMap;
use std::hash::Hash;

use super::geometry::{Point, Rect};

#[derive(Debug, Clone)]
struct Entry {
    bounds: Rect,
    layer: i32,
    /// Insertion stamp used as the tie-breaker.
    order: u64,
}

/// Maps keys to rectangles and answers "topmost key at point" queries.
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    entries: HashMap<K, Entry>,
    next_order: u64,
}

impl<K: Clone + Eq + Hash> SpatialIndex<K> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_order: 0,
        }
    }

    /// Inserts or replaces `key`.  A replaced key moves to the top of its layer.
    pub fn insert(&mut self, key: K, bounds: Rect, layer: i32) {
        let order = self.next_order;
        self.next_order += 1;
        self.entries.insert(
            key,
            Entry {
                bounds,
                layer,
                order,
            },
        );
    }

    /// Moves or resizes an existing entry without changing its stacking.
    ///
    /// Returns `false` if `key` is not indexed.
    pub fn update_bounds(&mut self, key: &K, bounds: Rect) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.bounds = bounds;
                true
            }
            None => false,
        }
    }

    /// Removes `key`, returning its bounds if it was present.
    pub fn remove(&mut self, key: &K) -> Option<Rect> {
        self.entries.remove(key).map(|e| e.bounds)
    }

    pub fn bounds(&self, key: &K) -> Option<Rect> {
        self.entries.get(key).map(|e| e.bounds)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the topmost key whose rectangle contains `point`.
    pub fn topmost_at(&self, point: Point) -> Option<&K> {
        if !point.is_finite() {
            return None;
        }
        self.entries
            .iter()
            .filter(|(_, e)| e.bounds.contains(point))
            .max_by_key(|(_, e)| (e.layer, e.order))
            .map(|(k, _)| k)
    }
}

impl<K: Clone + Eq + Hash> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
