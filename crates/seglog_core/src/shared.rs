//! A segment behind an explicit segment-wide lock.

use crate::error::CoreResult;
use crate::record::Record;
use crate::segment::Segment;
use parking_lot::RwLock;
use std::sync::Arc;

/// A cloneable handle that lets several threads append to one segment.
///
/// Each append holds the write lock for the whole store, index and
/// counter sequence, so readers never see an offset whose index entry has
/// not landed. Reads and queries share the read lock.
///
/// Prefer a plain [`Segment`] with a single writer when that is enough;
/// this lock serializes all appends.
#[derive(Debug, Clone)]
pub struct SharedSegment {
    inner: Arc<RwLock<Segment>>,
}

impl SharedSegment {
    /// Wraps a segment.
    #[must_use]
    pub fn new(segment: Segment) -> Self {
        Self {
            inner: Arc::new(RwLock::new(segment)),
        }
    }

    /// Appends a record under the write lock. See [`Segment::append`].
    pub fn append(&self, record: Record) -> CoreResult<u64> {
        self.inner.write().append(record)
    }

    /// Reads a record under the read lock. See [`Segment::read`].
    pub fn read(&self, offset: u64) -> CoreResult<Record> {
        self.inner.read().read(offset)
    }

    /// See [`Segment::is_maxed`].
    #[must_use]
    pub fn is_maxed(&self) -> bool {
        self.inner.read().is_maxed()
    }

    /// See [`Segment::base_offset`].
    #[must_use]
    pub fn base_offset(&self) -> u64 {
        self.inner.read().base_offset()
    }

    /// See [`Segment::next_offset`].
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.inner.read().next_offset()
    }

    /// Returns the segment if this is the last handle, for closing or
    /// removing it. Otherwise returns the handle unchanged.
    pub fn into_inner(self) -> Result<Segment, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}
