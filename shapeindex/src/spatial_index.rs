//! SpatialIndex trait definition.

use crate::bounding_box::BoundingBox;
use crate::errors::SpatialResult;
use crate::record_pointer::RecordPointer;

/// A bounding-box index over record locations.
///
/// This is the surface a data store sees: it stores `(box, pointer)` pairs
/// and answers overlap queries with pointers, never with shapes.
pub trait SpatialIndex: Send + Sync {
    /// Lazy, finite sequence of matching record pointers.
    type Cursor: Iterator<Item = SpatialResult<RecordPointer>>;

    /// Adds an entry to the index.
    fn insert(&self, bbox: &BoundingBox, pointer: RecordPointer) -> SpatialResult<()>;

    /// Removes the entry with exactly this box and pointer.
    fn delete(&self, bbox: &BoundingBox, pointer: RecordPointer) -> SpatialResult<bool>;

    /// Finds the entries whose box overlaps `query`.
    fn intersects(&self, query: &BoundingBox) -> SpatialResult<Self::Cursor>;

    /// Gets the number of entries.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes the index, flushing all pending changes.
    fn close(&self) -> SpatialResult<()>;
}
