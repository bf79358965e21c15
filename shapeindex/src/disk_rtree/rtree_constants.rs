//! Constants for the disk-based R-Tree file format.

/// Default page size (4KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest page size accepted; page 0 must still hold the file header.
pub const MIN_PAGE_SIZE: usize = 256;

/// Default maximum number of entries per node
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Default minimum number of entries per non-root node
pub const DEFAULT_MIN_ENTRIES: usize = 25;

/// Default cache size in decoded nodes
pub const DEFAULT_CACHE_PAGES: usize = 256;

/// Page frame: kind (u8), CRC32 (u32), payload length (u32)
pub const PAGE_FRAME_OVERHEAD: usize = 9;

/// Encoded node prefix: variant tag, entry count and level
pub const NODE_OVERHEAD: usize = 16;

/// Encoded bounding box of an entry
pub const ENTRY_KEY_SIZE: usize = 32;

/// Page 0 holds the file header; no node ever lives there.
pub const HEADER_PAGE: u64 = 0;

/// Null page reference (empty tree root, end of the free-list chain)
pub const NO_PAGE: u64 = 0;

/// Magic number for file format identification
pub const MAGIC: u32 = 0x5348_5254; // "SHRT"

/// File format version
pub const VERSION: u32 = 1;
