//! Error types for SegLog core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in segment operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store or index error, including end-of-data and end-of-capacity.
    #[error("storage error: {0}")]
    Storage(#[from] seglog_storage::StorageError),

    /// I/O error outside the store and index, e.g. removing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stored bytes are not a valid record.
    #[error("record decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The offset lies below the segment's base offset.
    #[error("offset {offset} is below base offset {base_offset}")]
    OffsetOutOfRange {
        /// The requested absolute offset.
        offset: u64,
        /// The segment's base offset.
        base_offset: u64,
    },

    /// The offset is too far from the base offset to fit an index entry.
    #[error("offset {offset} is too far from base offset {base_offset}")]
    RelativeOffsetOverflow {
        /// The absolute offset.
        offset: u64,
        /// The segment's base offset.
        base_offset: u64,
    },

    /// Store and index disagree.
    #[error("segment corruption: {message}")]
    SegmentCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// The configuration cannot be used to open a segment.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        message: String,
    },
}

impl CoreError {
    /// Creates a segment corruption error.
    pub fn segment_corruption(message: impl Into<String>) -> Self {
        Self::SegmentCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns `true` if a read addressed data that has not been written.
    #[must_use]
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_end_of_data())
    }

    /// Returns `true` if the segment can accept no more appends.
    #[must_use]
    pub fn is_end_of_capacity(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_end_of_capacity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seglog_storage::StorageError;

    #[test]
    fn classifies_storage_conditions() {
        let eod: CoreError = StorageError::EndOfData {
            offset: 0,
            len: 12,
            size: 0,
        }
        .into();
        assert!(eod.is_end_of_data());
        assert!(!eod.is_end_of_capacity());

        let eoc: CoreError = StorageError::EndOfCapacity {
            capacity: 36,
            required: 48,
        }
        .into();
        assert!(eoc.is_end_of_capacity());
        assert!(!eoc.is_end_of_data());

        assert!(!CoreError::segment_corruption("x").is_end_of_data());
    }
}
