//! A bounded range of offsets backed by one store and one index.
//!
//! ## Append Path
//!
//! ```text
//! record --encode--> store.append --position--> index.write(rel, position) --> next_offset += 1
//! ```
//!
//! ## Invariants
//!
//! - Every offset in `base_offset..next_offset` has an index entry whose
//!   position is valid in the store
//! - `base_offset` never changes
//! - `next_offset` is recovered from the last index entry on open, after
//!   dropping trailing entries whose store bytes never reached the file
//!
//! ## Known Gap
//!
//! If the index is full, the store append has already happened. The store
//! then ends with an entry no index entry points at. Such a segment must
//! not be appended to again; the entry is never served.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::offset::{index_file_name, relative_offset, store_file_name};
use crate::record::Record;
use seglog_storage::{Index, Store, LEN_WIDTH};
use std::fs;
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// One segment of the commit log.
///
/// A segment owns its store and index exclusively and does not decide
/// when to stop taking appends: callers poll [`Segment::is_maxed`] and
/// roll over, and must stop on an end-of-capacity error from
/// [`Segment::append`].
///
/// # Single Writer
///
/// An append is several steps (store, index, counter) that are not atomic
/// as a whole, so [`Segment::append`] takes `&mut self`. Use
/// [`crate::SharedSegment`] when several threads must append to the same
/// segment.
///
/// # Example
///
/// ```no_run
/// use seglog_core::{Config, Record, Segment};
/// use std::path::Path;
///
/// let config = Config::new().max_index_bytes(1024);
/// let mut segment = Segment::open(Path::new("/var/lib/log"), 16, config).unwrap();
///
/// let offset = segment.append(Record::new(b"hello world".to_vec())).unwrap();
/// assert_eq!(offset, 16);
/// assert_eq!(segment.read(offset).unwrap().value, b"hello world");
/// ```
#[derive(Debug)]
pub struct Segment {
    base_offset: u64,
    next_offset: u64,
    store: Store,
    index: Index,
    config: Config,
}

impl Segment {
    /// Opens or creates the segment starting at `base_offset` under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, either file cannot
    /// be opened, or the index cannot be mapped or read.
    pub fn open(dir: &Path, base_offset: u64, config: Config) -> CoreResult<Self> {
        config.validate()?;

        let store = Store::open(&dir.join(store_file_name(base_offset)))?;
        let index = Index::open(
            &dir.join(index_file_name(base_offset)),
            config.segment.max_index_bytes,
        )?;

        trim_unbacked_entries(base_offset, &index, &store)?;

        let next_offset = match index.read(-1) {
            Ok(last) => base_offset
                .checked_add(u64::from(last.relative_offset) + 1)
                .ok_or(CoreError::RelativeOffsetOverflow {
                    offset: u64::MAX,
                    base_offset,
                })?,
            Err(e) if e.is_end_of_data() => base_offset,
            Err(e) => return Err(e.into()),
        };

        debug!(
            base_offset,
            next_offset,
            store_size = store.size(),
            index_size = index.size(),
            "opened segment"
        );

        Ok(Self {
            base_offset,
            next_offset,
            store,
            index,
            config,
        })
    }

    /// Appends a record and returns the offset assigned to it.
    ///
    /// Any offset already set on `record` is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an end-of-capacity error (see
    /// [`CoreError::is_end_of_capacity`]) once the index is full. The
    /// segment must not be appended to after that.
    pub fn append(&mut self, mut record: Record) -> CoreResult<u64> {
        let offset = self.next_offset;
        let relative =
            relative_offset(self.base_offset, offset).ok_or(CoreError::RelativeOffsetOverflow {
                offset,
                base_offset: self.base_offset,
            })?;

        let next_offset = offset
            .checked_add(1)
            .ok_or(CoreError::RelativeOffsetOverflow {
                offset,
                base_offset: self.base_offset,
            })?;

        record.offset = offset;
        let payload = record.to_payload();
        let (_, position) = self.store.append(&payload)?;

        if let Err(e) = self.index.write(relative, position) {
            if e.is_end_of_capacity() {
                warn!(
                    base_offset = self.base_offset,
                    offset, position, "index full, store entry left unindexed"
                );
            }
            return Err(e.into());
        }

        self.next_offset = next_offset;
        trace!(offset, position, len = payload.len(), "appended record");

        Ok(offset)
    }

    /// Reads the record at absolute `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OffsetOutOfRange`] below the base offset, an
    /// end-of-data error at or past [`Segment::next_offset`], and
    /// [`CoreError::Decode`] if the stored bytes are not a record.
    pub fn read(&self, offset: u64) -> CoreResult<Record> {
        let Some(relative) = offset.checked_sub(self.base_offset) else {
            return Err(CoreError::OffsetOutOfRange {
                offset,
                base_offset: self.base_offset,
            });
        };
        let n = i64::try_from(relative).map_err(|_| CoreError::RelativeOffsetOverflow {
            offset,
            base_offset: self.base_offset,
        })?;

        let entry = self.index.read(n)?;
        if u64::from(entry.relative_offset) != relative {
            return Err(CoreError::segment_corruption(format!(
                "index entry {relative} of segment {} holds relative offset {}",
                self.base_offset, entry.relative_offset
            )));
        }

        let payload = self.store.read(entry.position)?;
        Record::from_payload(&payload)
    }

    /// Copies raw store bytes starting at `offset` into `buf`.
    ///
    /// For shipping the store file as-is, e.g. to a replica. Returns the
    /// number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns an end-of-data error once `offset` reaches the store size.
    pub fn read_store_at(&self, buf: &mut [u8], offset: u64) -> CoreResult<usize> {
        Ok(self.store.read_at(buf, offset)?)
    }

    /// Returns `true` once either file has reached its configured limit.
    ///
    /// The index limit is its capacity, `max_index_bytes` rounded down to
    /// whole entries, so this turns `true` exactly when the next append
    /// would fail on a full index.
    ///
    /// This is a query only; [`Segment::append`] does not consult it.
    #[must_use]
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.segment.max_store_bytes
            || self.index.size() >= self.index.capacity()
    }

    /// Returns the first offset this segment can hold.
    #[must_use]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Returns the offset the next append will receive.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Returns the number of records in the segment.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.next_offset - self.base_offset
    }

    /// Returns `true` if the segment holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next_offset == self.base_offset
    }

    /// Returns `true` if `offset` is served by this segment.
    #[must_use]
    pub fn contains(&self, offset: u64) -> bool {
        (self.base_offset..self.next_offset).contains(&offset)
    }

    /// Returns the store size in bytes.
    #[must_use]
    pub fn store_size(&self) -> u64 {
        self.store.size()
    }

    /// Returns the logical index size in bytes.
    #[must_use]
    pub fn index_size(&self) -> u64 {
        self.index.size()
    }

    /// Returns the path of the store file.
    #[must_use]
    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    /// Returns the path of the index file.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        self.index.path()
    }

    /// Returns the configuration the segment was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Closes the index, then the store.
    ///
    /// Both are closed even if the first fails.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub fn close(self) -> CoreResult<()> {
        let Self {
            base_offset,
            next_offset,
            store,
            index,
            ..
        } = self;

        let index_closed = index.close();
        let store_closed = store.close();
        index_closed?;
        store_closed?;

        debug!(base_offset, next_offset, "closed segment");
        Ok(())
    }

    /// Closes the segment and deletes its index and store files.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Files already deleted stay
    /// deleted; callers should retry or treat the segment as corrupt.
    pub fn remove(self) -> CoreResult<()> {
        let base_offset = self.base_offset;
        let index_path = self.index_path().to_path_buf();
        let store_path = self.store_path().to_path_buf();

        self.close()?;
        fs::remove_file(&index_path)?;
        fs::remove_file(&store_path)?;

        info!(base_offset, "removed segment");
        Ok(())
    }
}

/// Drops trailing index entries pointing past the end of the store.
///
/// The index is written through its mapping while the store is buffered,
/// so after a crash the index can be ahead of the store.
fn trim_unbacked_entries(base_offset: u64, index: &Index, store: &Store) -> CoreResult<()> {
    let store_size = store.size();
    let mut len = index.len();
    while len > 0 {
        let entry = index.read(i64::try_from(len - 1).map_err(|_| {
            CoreError::segment_corruption(format!("index of segment {base_offset} is too long"))
        })?)?;
        if entry.position.saturating_add(LEN_WIDTH) <= store_size {
            break;
        }
        len -= 1;
    }

    if len < index.len() {
        warn!(
            base_offset,
            store_size,
            kept = len,
            dropped = index.len() - len,
            "index entries point past the end of the store"
        );
        index.truncate(len)?;
    }
    Ok(())
}
