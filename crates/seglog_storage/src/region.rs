//! Fixed-capacity memory-mapped region with a separate logical length.

use crate::error::{StorageError, StorageResult};
use memmap2::MmapMut;
use std::fs::File;

/// A writable mapping of a pre-sized file.
///
/// `capacity` is the mapped length and never changes. `used` is the
/// prefix holding real data. Reads are checked against `used`; only
/// appends are checked against `capacity`.
///
/// The mapping is released when the region is dropped.
#[derive(Debug)]
pub struct MappedRegion {
    mmap: MmapMut,
    used: u64,
}

impl MappedRegion {
    /// Maps the whole of `file`, treating the first `used` bytes as data.
    ///
    /// The caller sizes the file to the desired capacity beforehand.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping fails or `used` exceeds the mapped
    /// length.
    pub fn map(file: &File, used: u64) -> StorageResult<Self> {
        // SAFETY: the file is owned by the index for the lifetime of the
        // mapping and is never resized while mapped. External modification
        // of the file while the segment is open is not supported.
        #[allow(unsafe_code)]
        let mmap = unsafe { MmapMut::map_mut(file)? };

        if used > mmap.len() as u64 {
            return Err(StorageError::Corrupted(format!(
                "used length {used} exceeds mapped length {}",
                mmap.len()
            )));
        }

        Ok(Self { mmap, used })
    }

    /// Returns the mapped length in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Returns the logical length in bytes.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Returns how many bytes can still be appended.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.capacity() - self.used
    }

    /// Returns `len` bytes at `offset` from the used prefix.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EndOfData`] if the range is not fully
    /// inside the used prefix.
    pub fn get(&self, offset: u64, len: u64) -> StorageResult<&[u8]> {
        let end = offset.saturating_add(len);
        if end > self.used {
            return Err(StorageError::EndOfData {
                offset,
                len,
                size: self.used,
            });
        }
        // `end <= used <= mmap.len()`, so both casts are lossless.
        Ok(&self.mmap[offset as usize..end as usize])
    }

    /// Copies `data` to the end of the used prefix and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EndOfCapacity`] if `data` does not fit.
    pub fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.used;
        let required = offset.saturating_add(data.len() as u64);
        if required > self.capacity() {
            return Err(StorageError::EndOfCapacity {
                capacity: self.capacity(),
                required,
            });
        }

        self.mmap[offset as usize..required as usize].copy_from_slice(data);
        self.used = required;
        Ok(offset)
    }

    /// Shrinks the used prefix to `used` bytes. Never grows it.
    pub fn truncate(&mut self, used: u64) {
        self.used = self.used.min(used);
    }

    /// Schedules write-back of a range without waiting for it.
    pub fn flush_range_async(&self, offset: u64, len: u64) -> StorageResult<()> {
        self.mmap.flush_async_range(offset as usize, len as usize)?;
        Ok(())
    }

    /// Writes the whole mapping back to the file and waits for completion.
    pub fn flush(&self) -> StorageResult<()> {
        self.mmap.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempfile;

    fn region(capacity: u64) -> MappedRegion {
        let file = tempfile().unwrap();
        file.set_len(capacity).unwrap();
        MappedRegion::map(&file, 0).unwrap()
    }

    #[test]
    fn append_advances_used() {
        let mut region = region(16);
        assert_eq!(region.capacity(), 16);
        assert_eq!(region.used(), 0);

        assert_eq!(region.append(b"abcd").unwrap(), 0);
        assert_eq!(region.append(b"efgh").unwrap(), 4);
        assert_eq!(region.used(), 8);
        assert_eq!(region.remaining(), 8);
        assert_eq!(region.get(2, 4).unwrap(), b"cdef");
    }

    #[test]
    fn get_is_bounded_by_used_not_capacity() {
        let mut region = region(16);
        region.append(b"abcd").unwrap();

        let err = region.get(2, 4).unwrap_err();
        assert!(err.is_end_of_data());
        assert!(region.get(4, 0).is_ok());
    }

    #[test]
    fn append_is_bounded_by_capacity() {
        let mut region = region(6);
        region.append(b"abcd").unwrap();

        let err = region.append(b"efg").unwrap_err();
        assert!(matches!(
            err,
            StorageError::EndOfCapacity {
                capacity: 6,
                required: 7
            }
        ));
        // A failed append leaves the region untouched.
        assert_eq!(region.used(), 4);
        region.append(b"ef").unwrap();
        assert_eq!(region.remaining(), 0);
    }

    #[test]
    fn truncate_only_shrinks() {
        let mut region = region(16);
        region.append(b"abcdefgh").unwrap();

        region.truncate(12);
        assert_eq!(region.used(), 8);

        region.truncate(4);
        assert_eq!(region.used(), 4);
        assert!(region.get(2, 4).unwrap_err().is_end_of_data());
        assert_eq!(region.append(b"xy").unwrap(), 4);
    }

    #[test]
    fn used_beyond_mapping_is_rejected() {
        let file = tempfile().unwrap();
        file.set_len(8).unwrap();
        let result = MappedRegion::map(&file, 9);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }
}
