use serde::{Deserialize, Serialize};

use crate::errors::{SpatialError, SpatialResult};

/// Size of the blocks a shapefile byte offset is split into.
pub const POINTER_BLOCK_SIZE: u64 = 8192;

/// Opaque location of a shape record: a block number and an offset in it.
///
/// The index never owns shape data, only these locators. For shapefiles
/// the pointer addresses the record header in the main file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct RecordPointer {
    pub page: u32,
    pub offset: u32,
}

impl RecordPointer {
    pub fn new(page: u32, offset: u32) -> RecordPointer {
        RecordPointer { page, offset }
    }

    /// Splits an absolute byte offset into block and in-block offset.
    pub fn from_file_offset(position: u64) -> SpatialResult<RecordPointer> {
        let page = position / POINTER_BLOCK_SIZE;
        let page = u32::try_from(page).map_err(|_| {
            SpatialError::InvalidOperation(format!(
                "file offset {} cannot be addressed by a record pointer",
                position
            ))
        })?;
        Ok(RecordPointer {
            page,
            offset: (position % POINTER_BLOCK_SIZE) as u32,
        })
    }

    /// Absolute byte offset this pointer addresses.
    pub fn file_offset(&self) -> u64 {
        self.page as u64 * POINTER_BLOCK_SIZE + self.offset as u64
    }
}

impl std::fmt::Display for RecordPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page, self.offset)
    }
}
