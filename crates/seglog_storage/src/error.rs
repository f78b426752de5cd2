//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read bytes or entries that have not been written.
    #[error("end of data: offset {offset}, len {len}, size {size}")]
    EndOfData {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: u64,
        /// The current logical size.
        size: u64,
    },

    /// A fixed-size region has no room for the requested write.
    #[error("end of capacity: {required} bytes required, capacity {capacity}")]
    EndOfCapacity {
        /// The mapped capacity in bytes.
        capacity: u64,
        /// The logical size the write would have needed.
        required: u64,
    },

    /// The file contents are not a valid store or index.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The index mapping has already been released.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Returns `true` if this error means "nothing written here yet".
    #[must_use]
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::EndOfData { .. })
    }

    /// Returns `true` if this error means the index can take no more entries.
    #[must_use]
    pub fn is_end_of_capacity(&self) -> bool {
        matches!(self, Self::EndOfCapacity { .. })
    }
}
