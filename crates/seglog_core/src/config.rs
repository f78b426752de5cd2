//! Segment configuration.
//!
//! Loading this from files or the environment is the log manager's job;
//! segments only consume it.

use crate::error::{CoreError, CoreResult};
use seglog_storage::ENTRY_WIDTH;

/// Limits for a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Store size in bytes at which the segment reports itself maxed.
    pub max_store_bytes: u64,

    /// Index size in bytes at which the segment reports itself maxed.
    /// Rounded down to whole 12-byte entries, this is also the mapped
    /// capacity of the index, so it is the hard limit that makes appends
    /// fail.
    pub max_index_bytes: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: 1024 * 1024 * 1024, // 1 GiB
            max_index_bytes: 10 * 1024 * 1024,   // 10 MiB
        }
    }
}

/// Configuration consumed by segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Per-segment limits.
    pub segment: SegmentConfig,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store size that marks a segment as maxed.
    #[must_use]
    pub const fn max_store_bytes(mut self, bytes: u64) -> Self {
        self.segment.max_store_bytes = bytes;
        self
    }

    /// Sets the index capacity in bytes.
    #[must_use]
    pub const fn max_index_bytes(mut self, bytes: u64) -> Self {
        self.segment.max_index_bytes = bytes;
        self
    }

    /// Checks that a segment can be opened with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the store limit is zero, the
    /// index cannot hold a single entry, or the index is too large to map.
    pub fn validate(&self) -> CoreResult<()> {
        let SegmentConfig {
            max_store_bytes,
            max_index_bytes,
        } = self.segment;

        if max_store_bytes == 0 {
            return Err(CoreError::invalid_config("max_store_bytes must be positive"));
        }
        if max_index_bytes < ENTRY_WIDTH {
            return Err(CoreError::invalid_config(format!(
                "max_index_bytes {max_index_bytes} cannot hold one {ENTRY_WIDTH}-byte entry"
            )));
        }
        if usize::try_from(max_index_bytes).is_err() {
            return Err(CoreError::invalid_config(format!(
                "max_index_bytes {max_index_bytes} exceeds the address space"
            )));
        }
        Ok(())
    }
}
