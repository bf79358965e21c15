//! # Shapeindex - Disk-Backed Spatial Index for Shape Records
//!
//! This crate provides a page-oriented, disk-based R-Tree over bounding
//! boxes and a bit-exact codec for shapefile shape records. The index
//! stores record locations only; shapes are decoded from their source on
//! demand.
//!
//! ## Features
//!
//! - **Disk-Based Storage**: Nodes live in fixed-size, checksummed pages and are loaded on demand
//! - **Free List**: Released pages are chained on disk and reused before the file grows
//! - **Split Heuristics**: Linear and quadratic node splits
//! - **Condense on Delete**: Underfull nodes are dissolved and their entries reinserted
//! - **LRU Cache**: Recently used nodes kept in memory, written through
//! - **Lazy Queries**: Results are produced as the iterator is pulled
//! - **Record Codec**: Points, multipoints, polylines and polygons in plain, M and Z variants
//!
//! ## R-Tree API
//!
//! ```rust,no_run
//! use shapeindex::{BoundingBox, DiskRTree, RTreeConfig, RecordPointer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RTreeConfig::builder()
//!     .max_entries(16)
//!     .min_entries(6)
//!     .split_algorithm_name("linear")
//!     .build()?;
//! let tree = DiskRTree::create("roads.idx", config)?;
//!
//! tree.insert(&BoundingBox::new(0.0, 0.0, 10.0, 10.0), RecordPointer::new(0, 100))?;
//!
//! let query = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
//! for pointer in tree.intersects(&query)? {
//!     println!("candidate record at {}", pointer?);
//! }
//! tree.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Shapefile Queries
//!
//! ```rust,no_run
//! use shapeindex::{BoundingBox, DiskRTree, IndexedShapefile, RTreeConfig, ShpReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = ShpReader::open("parcels.shp")?;
//! let tree = DiskRTree::create("parcels.idx", RTreeConfig::default())?;
//! let parcels = IndexedShapefile::build(reader, tree)?;
//!
//! for record in parcels.query(&BoundingBox::new(10.0, 50.0, 11.0, 51.0))? {
//!     let (pointer, shape) = record?;
//!     println!("{} has {} points", pointer, shape.num_points());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bounding_box;
pub mod config;
pub mod disk_rtree;
pub mod errors;
pub mod query;
pub mod record_pointer;
pub mod shape;
pub mod shapefile;
pub mod spatial_index;

pub use bounding_box::BoundingBox;
pub use config::{
    DataDefinition, Field, FieldKind, PageDefinition, RTreeConfig, RTreeConfigBuilder,
    SplitAlgorithm,
};
pub use disk_rtree::{DiskRTree, IntegrityReport, RTreeStats, TreeCursor};
pub use errors::{ErrorKind, SpatialError, SpatialResult};
pub use query::{IndexedShapefile, ShapeQuery};
pub use record_pointer::RecordPointer;
pub use shape::{Coordinate, Dimension, Shape, ShapeKind, ShapeType};
pub use shapefile::{RecordSource, ShpHeader, ShpReader, ShpWriter};
pub use spatial_index::SpatialIndex;
