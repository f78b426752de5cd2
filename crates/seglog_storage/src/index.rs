//! Memory-mapped index of fixed-width `(relative offset, position)` entries.
//!
//! ## Entry Format
//!
//! ```text
//! | relative_offset (4, BE) | position (8, BE) |
//! ```
//!
//! Entry `i` describes relative offset `i`, so looking one up is a
//! multiplication, not a search.

use crate::error::{StorageError, StorageResult};
use crate::region::MappedRegion;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Width of the relative offset field.
pub const OFFSET_WIDTH: u64 = 4;
/// Width of the store position field.
pub const POSITION_WIDTH: u64 = 8;
/// Width of one index entry.
pub const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

/// One decoded index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset relative to the owning segment's base offset.
    pub relative_offset: u32,
    /// Byte position of the record in the store.
    pub position: u64,
}

impl IndexEntry {
    fn to_bytes(self) -> [u8; ENTRY_WIDTH as usize] {
        let mut buf = [0u8; ENTRY_WIDTH as usize];
        buf[..4].copy_from_slice(&self.relative_offset.to_be_bytes());
        buf[4..].copy_from_slice(&self.position.to_be_bytes());
        buf
    }

    fn from_bytes(b: &[u8]) -> Self {
        Self {
            relative_offset: u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            position: u64::from_be_bytes([b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11]]),
        }
    }
}

/// An append-only index file backed by a fixed-capacity mapping.
///
/// While open, the file is pre-allocated to its capacity so appends never
/// grow it. The logical size is tracked separately; on close the mapping
/// is flushed and the file is truncated back to the logical size.
///
/// # Capacity
///
/// The capacity is rounded down to a whole number of entries, so a full
/// index has exactly `capacity() == size()`. A write with no room for one
/// more entry fails with [`StorageError::EndOfCapacity`]. This is the
/// condition that forces the owner to roll over to a new segment.
///
/// # Thread Safety
///
/// All access goes through an internal mutex held for a single call.
#[derive(Debug)]
pub struct Index {
    path: PathBuf,
    inner: Mutex<IndexInner>,
}

#[derive(Debug)]
struct IndexInner {
    file: File,
    region: Option<MappedRegion>,
}

impl IndexInner {
    fn region(&self) -> StorageResult<&MappedRegion> {
        self.region.as_ref().ok_or(StorageError::Closed)
    }

    fn region_mut(&mut self) -> StorageResult<&mut MappedRegion> {
        self.region.as_mut().ok_or(StorageError::Closed)
    }
}

impl Index {
    /// Opens or creates an index with room for `max_index_bytes`.
    ///
    /// The existing file length becomes the logical size. A file already
    /// longer than `max_index_bytes` keeps all of its entries and is simply
    /// full.
    ///
    /// A file left at its pre-allocated length by an unclean shutdown ends
    /// in zeroed entries. Entries are gapless, so trailing entries whose
    /// relative offset does not match their entry number are dropped from
    /// the logical size.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, its length is not a
    /// whole number of entries, or it cannot be mapped. On a mapping
    /// failure the pre-allocation is undone first.
    pub fn open(path: &Path, max_index_bytes: u64) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let used = file.metadata()?.len();
        if used % ENTRY_WIDTH != 0 {
            return Err(StorageError::Corrupted(format!(
                "index {} has length {used}, not a multiple of {ENTRY_WIDTH}",
                path.display()
            )));
        }

        let capacity = (max_index_bytes - max_index_bytes % ENTRY_WIDTH).max(used);
        if capacity > used {
            file.set_len(capacity)?;
        }

        let mut region = match MappedRegion::map(&file, used) {
            Ok(region) => region,
            Err(e) => {
                if let Err(undo) = file.set_len(used) {
                    warn!(path = %path.display(), error = %undo, "failed to undo index pre-allocation");
                }
                return Err(e);
            }
        };

        let written = written_len(&region)?;
        if written < used {
            warn!(
                path = %path.display(),
                file_len = used,
                written,
                "index was not closed cleanly, dropping unwritten entries"
            );
            region.truncate(written);
        }

        debug!(path = %path.display(), used = written, capacity, "opened index");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(IndexInner {
                file,
                region: Some(region),
            }),
        })
    }

    /// Appends an entry mapping `relative_offset` to a store `position`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EndOfCapacity`] if the mapping has no room
    /// for another entry.
    pub fn write(&self, relative_offset: u32, position: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        let region = inner.region_mut()?;

        debug_assert_eq!(
            u64::from(relative_offset),
            region.used() / ENTRY_WIDTH,
            "index entries must be gapless"
        );

        let entry = IndexEntry {
            relative_offset,
            position,
        };
        let offset = region.append(&entry.to_bytes())?;
        region.flush_range_async(offset, ENTRY_WIDTH)?;

        Ok(())
    }

    /// Reads entry `n`, or the last entry when `n == -1`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EndOfData`] if the index is empty, `n` is
    /// below `-1`, or `n` addresses an entry that has not been written.
    pub fn read(&self, n: i64) -> StorageResult<IndexEntry> {
        let inner = self.inner.lock();
        let region = inner.region()?;
        let used = region.used();

        let entry_no = match n {
            _ if used == 0 => None,
            -1 => Some(used / ENTRY_WIDTH - 1),
            n => u64::try_from(n).ok(),
        };
        let Some(entry_no) = entry_no else {
            return Err(StorageError::EndOfData {
                offset: u64::try_from(n).unwrap_or(0).saturating_mul(ENTRY_WIDTH),
                len: ENTRY_WIDTH,
                size: used,
            });
        };

        let bytes = region.get(entry_no.saturating_mul(ENTRY_WIDTH), ENTRY_WIDTH)?;
        Ok(IndexEntry::from_bytes(bytes))
    }

    /// Drops every entry from entry number `len` on.
    ///
    /// Only the logical size shrinks; the file is cut to it on close.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Closed`] if the index has been shut down.
    pub fn truncate(&self, len: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        inner
            .region_mut()?
            .truncate(len.saturating_mul(ENTRY_WIDTH));
        Ok(())
    }

    /// Returns the logical size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.lock().region.as_ref().map_or(0, MappedRegion::used)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.size() / ENTRY_WIDTH
    }

    /// Returns `true` if no entry has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the mapped capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.inner
            .lock()
            .region
            .as_ref()
            .map_or(0, MappedRegion::capacity)
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes the mapping, truncates the file to its logical size and
    /// releases it.
    ///
    /// # Errors
    ///
    /// Returns the first error among flushing, truncating and syncing.
    pub fn close(mut self) -> StorageResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> StorageResult<()> {
        let inner = self.inner.get_mut();
        let Some(region) = inner.region.take() else {
            return Ok(());
        };

        let used = region.used();
        let flushed = region.flush();
        // Unmap before truncating; some platforms refuse to resize a mapped file.
        drop(region);

        let truncated = inner
            .file
            .set_len(used)
            .and_then(|()| inner.file.sync_all())
            .map_err(StorageError::from);

        debug!(path = %self.path.display(), used, "closed index");
        flushed.and(truncated)
    }
}

/// Length in bytes of the prefix of `region` holding written entries.
///
/// Entry 0 is always kept: a zeroed first entry is indistinguishable from
/// a real one pointing at store position 0.
fn written_len(region: &MappedRegion) -> StorageResult<u64> {
    let mut entries = region.used() / ENTRY_WIDTH;
    while entries > 1 {
        let last = entries - 1;
        let entry = IndexEntry::from_bytes(region.get(last * ENTRY_WIDTH, ENTRY_WIDTH)?);
        if u64::from(entry.relative_offset) == last {
            break;
        }
        entries = last;
    }
    Ok(entries * ENTRY_WIDTH)
}

impl Drop for Index {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(path = %self.path.display(), error = %e, "failed to close index on drop");
        }
    }
}
