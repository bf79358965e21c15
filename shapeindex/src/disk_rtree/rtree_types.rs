//! Core types and data structures for the disk-based R-Tree.
//!
//! This module defines:
//! - Page kinds and node types (Leaf and Internal)
//! - The file header and free-list page payloads
//! - Statistics and integrity report structures

use serde::{Deserialize, Serialize};

use crate::bounding_box::BoundingBox;
use crate::config::PageDefinition;
use crate::errors::{SpatialError, SpatialResult};
use crate::record_pointer::RecordPointer;

use super::rtree_constants::{MAGIC, NO_PAGE, VERSION};

/// Page ID - number of a fixed-size page in the index file
pub type PageId = u64;

// ============================================================================
// Page Kinds
// ============================================================================

/// Discriminator stored in the first byte of every page frame.
///
/// A zero byte means the page was allocated but never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Free,
    Leaf,
    Internal,
}

impl PageKind {
    pub fn as_u8(self) -> u8 {
        match self {
            PageKind::Free => 1,
            PageKind::Leaf => 2,
            PageKind::Internal => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<PageKind> {
        match value {
            1 => Some(PageKind::Free),
            2 => Some(PageKind::Leaf),
            3 => Some(PageKind::Internal),
            _ => None,
        }
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// An entry in a leaf node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeafEntry {
    pub bbox: BoundingBox,
    pub pointer: RecordPointer,
}

/// A child reference in an internal node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    pub bbox: BoundingBox,
    pub page_id: PageId,
}

/// Node types in the R-Tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Leaf node containing actual entries
    Leaf { entries: Vec<LeafEntry> },
    /// Internal node containing child references
    Internal {
        children: Vec<ChildRef>,
        level: u32, // Height from leaf level (leaves are 0)
    },
}

impl Node {
    /// Get the bounding box enclosing all children/entries
    pub fn compute_bbox(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        match self {
            Node::Leaf { entries } => entries.iter().for_each(|e| bbox.expand(&e.bbox)),
            Node::Internal { children, .. } => children.iter().for_each(|c| bbox.expand(&c.bbox)),
        }
        bbox
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn level(&self) -> u32 {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal { level, .. } => *level,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Leaf { entries } => entries.len(),
            Node::Internal { children, .. } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn page_kind(&self) -> PageKind {
        match self {
            Node::Leaf { .. } => PageKind::Leaf,
            Node::Internal { .. } => PageKind::Internal,
        }
    }

    /// Serializes the node into a page payload.
    pub fn encode(&self) -> SpatialResult<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(
            self,
            bincode::config::legacy(),
        )?)
    }

    /// Deserializes a page payload read under `kind`.
    pub fn decode(page_id: PageId, kind: PageKind, payload: &[u8]) -> SpatialResult<Node> {
        let (node, _): (Node, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::legacy())?;
        if node.page_kind() != kind {
            return Err(SpatialError::Corruption(format!(
                "page {} is framed as {:?} but holds a {:?} node",
                page_id,
                kind,
                node.page_kind()
            )));
        }
        Ok(node)
    }
}

// ============================================================================
// Free List Page
// ============================================================================

/// A free page in the free list chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreePage {
    /// Next free page in the chain (0 = end of chain)
    pub next_free: PageId,
}

// ============================================================================
// File Header
// ============================================================================

/// File header stored in page 0 of the index file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub page_definition: PageDefinition,
    pub root_page: PageId,
    pub height: u32,
    pub entry_count: u64,
    pub next_page_id: PageId,
    pub free_list_head: PageId,
    pub free_page_count: u64,
}

impl FileHeader {
    pub fn new(page_definition: PageDefinition) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            page_definition,
            root_page: NO_PAGE,
            height: 0,
            entry_count: 0,
            next_page_id: 1,
            free_list_head: NO_PAGE,
            free_page_count: 0,
        }
    }

    pub fn validate(&self) -> SpatialResult<()> {
        if self.magic != MAGIC {
            return Err(SpatialError::Configuration(
                "not an index file (bad magic)".into(),
            ));
        }
        if self.version != VERSION {
            return Err(SpatialError::Configuration(format!(
                "unsupported file format version {}",
                self.version
            )));
        }
        if self.next_page_id == 0 || self.root_page >= self.next_page_id {
            return Err(SpatialError::Corruption(format!(
                "root page {} outside of {} allocated pages",
                self.root_page, self.next_page_id
            )));
        }
        Ok(())
    }
}

/// Root, height and entry count of the tree, as kept in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeState {
    pub root_page: PageId,
    pub height: u32,
    pub entry_count: u64,
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about R-Tree operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RTreeStats {
    pub total_entries: u64,
    pub tree_height: u32,
    pub page_size: usize,
    /// Pages handed out so far, header excluded
    pub allocated_pages: u64,
    pub free_pages: u64,
    pub cached_pages: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

/// Result of integrity check operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    /// Total pages checked
    pub pages_checked: u64,
    /// Pages reachable from the root
    pub reachable_pages: u64,
    /// Pages on the free list
    pub free_pages: u64,
    /// Leaf entries found by walking the tree
    pub leaf_entries: u64,
    /// Pages neither reachable nor free
    pub orphaned_pages: Vec<PageId>,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.orphaned_pages.is_empty()
    }
}
