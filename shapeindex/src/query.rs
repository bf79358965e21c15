//! Bounding-box queries over shape records.
//!
//! [`IndexedShapefile`] pairs a [`RecordSource`] with a [`SpatialIndex`]
//! holding the envelope of every record. A query only guarantees that the
//! envelopes overlap; testing the exact geometry is left to the caller.

use crate::bounding_box::BoundingBox;
use crate::disk_rtree::DiskRTree;
use crate::errors::SpatialResult;
use crate::record_pointer::RecordPointer;
use crate::shape::{codec, Shape};
use crate::shapefile::{RecordSource, ShpReader};
use crate::spatial_index::SpatialIndex;

/// A record source and the spatial index over its records.
pub struct IndexedShapefile<S, I = DiskRTree> {
    source: S,
    index: I,
}

impl<S: RecordSource, I: SpatialIndex> IndexedShapefile<S, I> {
    /// Pairs a source with an index that already covers it.
    pub fn new(source: S, index: I) -> Self {
        IndexedShapefile { source, index }
    }

    /// Adds the envelope of `shape` under `pointer`.
    ///
    /// Returns false for null and empty shapes, which are not indexed.
    pub fn index_record(&self, pointer: RecordPointer, shape: &Shape) -> SpatialResult<bool> {
        match shape.envelope() {
            Some(envelope) => {
                self.index.insert(&envelope, pointer)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Lazily yields the records whose envelope overlaps `envelope`.
    ///
    /// A record is read and decoded only when its item is pulled.
    pub fn query(&self, envelope: &BoundingBox) -> SpatialResult<ShapeQuery<'_, S, I::Cursor>> {
        let candidates = self.index.intersects(envelope)?;
        Ok(ShapeQuery {
            source: &self.source,
            candidates,
            done: false,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn into_parts(self) -> (S, I) {
        (self.source, self.index)
    }
}

impl<I: SpatialIndex> IndexedShapefile<ShpReader, I> {
    /// Indexes every non-null record of `reader` into `index`.
    pub fn build(reader: ShpReader, index: I) -> SpatialResult<Self> {
        let indexed = IndexedShapefile::new(reader, index);
        let mut count = 0u64;
        let mut skipped = 0u64;
        for record in indexed.source.records() {
            let (pointer, shape) = record?;
            if indexed.index_record(pointer, &shape)? {
                count += 1;
            } else {
                skipped += 1;
            }
        }
        log::debug!("Indexed {} records, skipped {} null records", count, skipped);
        Ok(indexed)
    }
}

/// Iterator returned by [`IndexedShapefile::query`]. Stops after the first
/// error.
pub struct ShapeQuery<'a, S, C> {
    source: &'a S,
    candidates: C,
    done: bool,
}

impl<S, C> Iterator for ShapeQuery<'_, S, C>
where
    S: RecordSource,
    C: Iterator<Item = SpatialResult<RecordPointer>>,
{
    type Item = SpatialResult<(RecordPointer, Shape)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.candidates.next()?.and_then(|pointer| {
            let content = self.source.read_content(pointer)?;
            let shape = codec::decode(&content, self.source.shape_type())?;
            Ok((pointer, shape))
        });
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
