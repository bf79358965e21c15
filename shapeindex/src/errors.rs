//! Error types shared by the record codec, the page store and the R-Tree.

use std::fmt::{Display, Formatter};
use std::io;
use thiserror::Error;

/// Coarse error category.
///
/// Callers embedding the index usually translate failures into their own
/// I/O conventions; matching on the kind avoids matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid construction parameters or an incompatible existing file
    Configuration,
    /// Record bytes do not match the declared shape type
    Format,
    /// A page or record reference is out of range or structurally broken
    Corruption,
    /// A caller supplied a degenerate bounding box
    Validation,
    /// The call is not valid in the current state
    InvalidOperation,
    /// Page payload or header could not be encoded or decoded
    Serialization,
    /// Underlying file I/O failed
    Io,
    /// The store or tree has already been closed
    Closed,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "Configuration error"),
            ErrorKind::Format => write!(f, "Format error"),
            ErrorKind::Corruption => write!(f, "Corruption error"),
            ErrorKind::Validation => write!(f, "Validation error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::Serialization => write!(f, "Serialization error"),
            ErrorKind::Io => write!(f, "IO error"),
            ErrorKind::Closed => write!(f, "Closed"),
        }
    }
}

/// Errors that can occur in spatial indexing and record codec operations
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Store is closed")]
    Closed,
}

impl SpatialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpatialError::Configuration(_) => ErrorKind::Configuration,
            SpatialError::Format(_) => ErrorKind::Format,
            SpatialError::Corruption(_) => ErrorKind::Corruption,
            SpatialError::Validation(_) => ErrorKind::Validation,
            SpatialError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            SpatialError::Serialization(_) => ErrorKind::Serialization,
            SpatialError::Io(_) => ErrorKind::Io,
            SpatialError::Closed => ErrorKind::Closed,
        }
    }
}

impl From<bincode::error::EncodeError> for SpatialError {
    fn from(err: bincode::error::EncodeError) -> Self {
        SpatialError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for SpatialError {
    fn from(err: bincode::error::DecodeError) -> Self {
        SpatialError::Serialization(err.to_string())
    }
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;
