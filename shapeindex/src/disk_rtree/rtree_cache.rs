//! LRU cache of decoded R-Tree nodes.
//!
//! The cache never preloads anything: a node enters it only after it was
//! read from disk or written through. Writes always reach the page store
//! first, so evicting an entry never loses data.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::rtree_types::{Node, PageId};

/// Bounded, write-through cache of decoded nodes keyed by page.
pub struct NodeCache {
    /// `None` when caching is disabled
    nodes: Option<LruCache<PageId, Node>>,
    hits: u64,
    misses: u64,
}

impl NodeCache {
    /// Creates a cache holding up to `capacity` nodes; zero disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns a copy of the cached node, refreshing its recency.
    pub fn get(&mut self, page_id: PageId) -> Option<Node> {
        let found = self
            .nodes
            .as_mut()
            .and_then(|nodes| nodes.get(&page_id).cloned());
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn put(&mut self, page_id: PageId, node: Node) {
        if let Some(nodes) = self.nodes.as_mut() {
            nodes.put(page_id, node);
        }
    }

    pub fn remove(&mut self, page_id: PageId) {
        if let Some(nodes) = self.nodes.as_mut() {
            nodes.pop(&page_id);
        }
    }

    pub fn clear(&mut self) {
        if let Some(nodes) = self.nodes.as_mut() {
            nodes.clear();
        }
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.nodes
            .as_ref()
            .is_some_and(|nodes| nodes.contains(&page_id))
    }

    pub fn len(&self) -> usize {
        self.nodes.as_ref().map_or(0, |nodes| nodes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.nodes.as_ref().map_or(0, |nodes| nodes.cap().get())
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
