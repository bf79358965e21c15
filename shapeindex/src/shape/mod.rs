//! Shape records and their bit-exact binary codec.
//!
//! [`Shape`] is the decoded form of a record; [`codec`] translates it to and
//! from record content bytes with a single dispatch per operation.

pub mod codec;
mod geometry;
mod shape_type;

pub use codec::{null_shape, length, read, read_sized, write};
pub use geometry::{Coordinate, Shape, ShapeExtent, NO_DATA, NO_DATA_THRESHOLD};
pub use shape_type::{Dimension, ShapeKind, ShapeType};
