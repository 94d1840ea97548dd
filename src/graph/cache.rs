use crate::graph::Layout;
use crate::types::{GraphEdge, GraphNode};
use std::collections::HashMap;

const DEFAULT_CAPACITY: usize = 100;

/// Memoizes diagram derivation so incidental redraws skip the layout
/// pass. Holds no authoritative state: clearing it at any point only
/// costs recomputation.
///
/// Four sub-maps share one key space and one LRU budget. Recency is a
/// monotonic access counter per key with an O(n) eviction scan, which is
/// fine at this capacity. Callers construct keys from coarse
/// cardinalities (see [`layout_key`]); a manual relayout bump changes
/// the key rather than mutating entries.
///
/// Pass this around explicitly; it is deliberately not a global.
#[derive(Debug, Default)]
pub struct LayoutCache {
    nodes: HashMap<String, Vec<GraphNode>>,
    edges: HashMap<String, Vec<GraphEdge>>,
    layouts: HashMap<String, Layout>,
    table_lookups: HashMap<String, HashMap<String, String>>,
    access: HashMap<String, u64>,
    counter: u64,
    capacity: usize,
}

/// Cache key from the coarse inputs that invalidate a layout.
pub fn layout_key(table_count: usize, suggestion_count: usize, relayout_version: u64) -> String {
    format!("layout-{table_count}-{suggestion_count}-{relayout_version}")
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ..Self::default()
        }
    }

    pub fn get_nodes(&mut self, key: &str) -> Option<&Vec<GraphNode>> {
        if self.nodes.contains_key(key) {
            self.touch(key);
        }
        self.nodes.get(key)
    }

    pub fn set_nodes(&mut self, key: &str, nodes: Vec<GraphNode>) {
        self.reserve(key);
        self.nodes.insert(key.to_string(), nodes);
    }

    pub fn get_edges(&mut self, key: &str) -> Option<&Vec<GraphEdge>> {
        if self.edges.contains_key(key) {
            self.touch(key);
        }
        self.edges.get(key)
    }

    pub fn set_edges(&mut self, key: &str, edges: Vec<GraphEdge>) {
        self.reserve(key);
        self.edges.insert(key.to_string(), edges);
    }

    pub fn get_layout(&mut self, key: &str) -> Option<&Layout> {
        if self.layouts.contains_key(key) {
            self.touch(key);
        }
        self.layouts.get(key)
    }

    pub fn set_layout(&mut self, key: &str, layout: Layout) {
        self.reserve(key);
        self.layouts.insert(key.to_string(), layout);
    }

    pub fn get_table_lookup(&mut self, key: &str) -> Option<&HashMap<String, String>> {
        if self.table_lookups.contains_key(key) {
            self.touch(key);
        }
        self.table_lookups.get(key)
    }

    pub fn set_table_lookup(&mut self, key: &str, lookup: HashMap<String, String>) {
        self.reserve(key);
        self.table_lookups.insert(key.to_string(), lookup);
    }

    /// Clear everything, or only the keys containing `pattern`.
    pub fn invalidate(&mut self, pattern: Option<&str>) {
        match pattern {
            None => {
                self.nodes.clear();
                self.edges.clear();
                self.layouts.clear();
                self.table_lookups.clear();
                self.access.clear();
            }
            Some(pattern) => {
                let doomed: Vec<String> = self
                    .access
                    .keys()
                    .filter(|key| key.contains(pattern))
                    .cloned()
                    .collect();
                for key in doomed {
                    self.remove(&key);
                }
            }
        }
    }

    /// Number of distinct keys currently tracked across all sub-maps.
    pub fn len(&self) -> usize {
        self.access.len()
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_empty()
    }

    fn touch(&mut self, key: &str) {
        self.counter += 1;
        self.access.insert(key.to_string(), self.counter);
    }

    /// Make room for a key before a set: evict the single least recently
    /// used key once the tracked-key count has reached capacity.
    fn reserve(&mut self, key: &str) {
        if !self.access.contains_key(key) && self.access.len() >= self.capacity {
            if let Some(lru) = self
                .access
                .iter()
                .min_by_key(|(_, stamp)| **stamp)
                .map(|(key, _)| key.clone())
            {
                self.remove(&lru);
            }
        }
        self.touch(key);
    }

    fn remove(&mut self, key: &str) {
        self.nodes.remove(key);
        self.edges.remove(key);
        self.layouts.remove(key);
        self.table_lookups.remove(key);
        self.access.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::compute_layout;

    #[test]
    fn get_returns_what_set_stored() {
        let mut cache = LayoutCache::new();
        let layout = compute_layout(&["users".to_string()]);
        cache.set_layout("layout-1-0-0", layout.clone());
        assert_eq!(cache.get_layout("layout-1-0-0"), Some(&layout));
        assert_eq!(cache.get_layout("layout-2-0-0"), None);
    }

    #[test]
    fn eviction_removes_least_recently_used_key() {
        let mut cache = LayoutCache::with_capacity(2);
        cache.set_layout("a", Layout::default());
        cache.set_layout("b", Layout::default());
        // refresh "a" so "b" is the LRU entry
        assert!(cache.get_layout("a").is_some());
        cache.set_layout("c", Layout::default());
        assert!(cache.get_layout("a").is_some());
        assert!(cache.get_layout("b").is_none());
        assert!(cache.get_layout("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwriting_a_tracked_key_does_not_evict() {
        let mut cache = LayoutCache::with_capacity(2);
        cache.set_layout("a", Layout::default());
        cache.set_layout("b", Layout::default());
        cache.set_layout("a", compute_layout(&["x".to_string()]));
        assert_eq!(cache.len(), 2);
        assert!(cache.get_layout("b").is_some());
    }

    #[test]
    fn eviction_clears_all_sub_maps_for_the_key() {
        let mut cache = LayoutCache::with_capacity(1);
        cache.set_nodes("old", Vec::new());
        cache.set_edges("old", Vec::new());
        cache.set_layout("fresh", Layout::default());
        assert!(cache.get_nodes("old").is_none());
        assert!(cache.get_edges("old").is_none());
        assert!(cache.get_layout("fresh").is_some());
    }

    #[test]
    fn invalidate_all_empties_the_cache() {
        let mut cache = LayoutCache::new();
        cache.set_nodes("layout-3-0-0", Vec::new());
        cache.set_edges("layout-3-0-0", Vec::new());
        cache.invalidate(None);
        assert!(cache.is_empty());
        assert!(cache.get_nodes("layout-3-0-0").is_none());
    }

    #[test]
    fn invalidate_by_substring_only_hits_matching_keys() {
        let mut cache = LayoutCache::new();
        cache.set_layout("layout-3-0-0", Layout::default());
        cache.set_layout("layout-3-0-1", Layout::default());
        cache.set_layout("layout-5-2-0", Layout::default());
        cache.invalidate(Some("layout-3"));
        assert!(cache.get_layout("layout-3-0-0").is_none());
        assert!(cache.get_layout("layout-3-0-1").is_none());
        assert!(cache.get_layout("layout-5-2-0").is_some());
    }

    #[test]
    fn layout_key_encodes_cardinalities_and_version() {
        assert_eq!(layout_key(12, 4, 2), "layout-12-4-2");
    }
}
