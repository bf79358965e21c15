//! Disk-based R-Tree for memory-efficient spatial indexing.
//!
//! This module provides an R-Tree whose nodes live in a page file:
//! - Fixed-size, checksummed pages with an on-disk free list
//! - Linear and quadratic node split heuristics
//! - Condense-and-reinsert deletion
//! - An LRU cache of decoded nodes, written through on every change
//! - Lazy queries that read pages only as results are pulled
//!
//! Nodes reference each other by page number only; nothing is loaded up
//! front when a tree is opened.

pub mod page_store;
pub mod rtree_cache;
pub mod rtree_constants;
pub mod rtree_types;
mod rtree_impl;
mod split;

pub use page_store::{Page, PageStore, PageStoreStats};
pub use rtree_constants::DEFAULT_CACHE_PAGES;
pub use rtree_impl::{DiskRTree, TreeCursor};
pub use rtree_types::{
    ChildRef, FileHeader, FreePage, IntegrityReport, LeafEntry, Node, PageId, PageKind,
    RTreeStats, TreeState,
};
