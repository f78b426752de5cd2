//! Append-only store file of length-prefixed records.

use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Width of the big-endian length prefix in front of every entry.
pub const LEN_WIDTH: u64 = 8;

/// An append-only file of `[8-byte BE length][payload]` entries.
///
/// The position of an entry is the byte offset of its length prefix.
/// The current size is tracked in memory, so appends never ask the
/// filesystem where the end of the file is.
///
/// # Buffering
///
/// Appends go through a write buffer. Every read flushes the buffer
/// first, so a reader always observes its own prior appends. Call
/// [`Store::sync`] when the data must survive a crash.
///
/// # Thread Safety
///
/// A single mutex serializes appends and reads. An entry is either fully
/// appended or not visible to any other caller.
///
/// # Example
///
/// ```no_run
/// use seglog_storage::Store;
/// use std::path::Path;
///
/// let store = Store::open(Path::new("0.store")).unwrap();
/// let (_written, pos) = store.append(b"hello world").unwrap();
/// assert_eq!(store.read(pos).unwrap(), b"hello world");
/// store.close().unwrap();
/// ```
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    writer: BufWriter<File>,
    size: u64,
}

impl Store {
    /// Opens or creates a store at the given path.
    ///
    /// The file is opened in append mode; its current length becomes the
    /// position of the next entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or inspected.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(StoreInner {
                writer: BufWriter::new(file),
                size,
            }),
        })
    }

    /// Appends one entry.
    ///
    /// Returns `(bytes_written, position)`, where `bytes_written` includes
    /// the length prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffered write fails.
    pub fn append(&self, payload: &[u8]) -> StorageResult<(u64, u64)> {
        let mut inner = self.inner.lock();
        let position = inner.size;
        let len = payload.len() as u64;

        inner.writer.write_all(&len.to_be_bytes())?;
        inner.writer.write_all(payload)?;

        let written = LEN_WIDTH + len;
        inner.size += written;

        Ok((written, position))
    }

    /// Reads the payload of the entry starting at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EndOfData`] if the length prefix or the
    /// payload it announces runs past the end of the store.
    pub fn read(&self, position: u64) -> StorageResult<Vec<u8>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.writer.flush()?;

        let size = inner.size;
        if position.saturating_add(LEN_WIDTH) > size {
            return Err(StorageError::EndOfData {
                offset: position,
                len: LEN_WIDTH,
                size,
            });
        }

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(position))?;

        let mut len_bytes = [0u8; LEN_WIDTH as usize];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_be_bytes(len_bytes);

        let start = position + LEN_WIDTH;
        if start.saturating_add(len) > size {
            return Err(StorageError::EndOfData {
                offset: start,
                len,
                size,
            });
        }

        let len = usize::try_from(len).map_err(|_| {
            StorageError::Corrupted(format!("entry at {position} too large: {len} bytes"))
        })?;
        let mut payload = vec![0u8; len];
        file.read_exact(&mut payload)?;

        Ok(payload)
    }

    /// Copies raw store bytes starting at `offset` into `buf`.
    ///
    /// This bypasses the entry framing and is meant for streaming the
    /// whole file, e.g. to a replica. Returns the number of bytes copied,
    /// which is short only when the end of the store is reached.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EndOfData`] if `offset` is at or past the end.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> StorageResult<usize> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.writer.flush()?;

        let size = inner.size;
        if offset >= size {
            return Err(StorageError::EndOfData {
                offset,
                len: buf.len() as u64,
                size,
            });
        }

        let remaining = size - offset;
        let n = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf[..n])?;

        Ok(n)
    }

    /// Pushes buffered appends to the OS.
    pub fn flush(&self) -> StorageResult<()> {
        self.inner.lock().writer.flush()?;
        Ok(())
    }

    /// Flushes and syncs data and metadata to disk.
    pub fn sync(&self) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Returns the logical size in bytes, including buffered appends.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered appends and releases the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn close(self) -> StorageResult<()> {
        let mut inner = self.inner.into_inner();
        inner.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    const PAYLOAD: &[u8] = b"hello world";
    const WIDTH: u64 = LEN_WIDTH + PAYLOAD.len() as u64;

    #[test]
    fn store_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.store");

        let store = Store::open(&path).unwrap();
        assert_eq!(store.size(), 0);
        assert!(path.exists());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn store_append_and_read() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("0.store")).unwrap();

        for i in 0..3u64 {
            let (written, pos) = store.append(PAYLOAD).unwrap();
            assert_eq!(written, WIDTH);
            assert_eq!(pos, i * WIDTH);
        }
        assert_eq!(store.size(), 3 * WIDTH);

        for i in 0..3u64 {
            assert_eq!(store.read(i * WIDTH).unwrap(), PAYLOAD);
        }
    }

    #[test]
    fn store_entry_layout_is_big_endian_prefixed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.store");

        let store = Store::open(&path).unwrap();
        store.append(b"abc").unwrap();
        store.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn store_read_past_end_fails() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("0.store")).unwrap();
        store.append(PAYLOAD).unwrap();

        let result = store.read(WIDTH);
        assert!(matches!(result, Err(StorageError::EndOfData { .. })));

        // Inside the payload: the "prefix" there announces garbage.
        let result = store.read(4);
        assert!(result.unwrap_err().is_end_of_data());
    }

    #[test]
    fn store_truncated_payload_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.store");
        {
            let store = Store::open(&path).unwrap();
            store.append(PAYLOAD).unwrap();
            store.close().unwrap();
        }
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(WIDTH - 2).unwrap();
        drop(file);

        let store = Store::open(&path).unwrap();
        assert!(store.read(0).unwrap_err().is_end_of_data());
    }

    #[test]
    fn store_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.store");

        {
            let store = Store::open(&path).unwrap();
            store.append(PAYLOAD).unwrap();
            store.close().unwrap();
        }

        {
            let store = Store::open(&path).unwrap();
            assert_eq!(store.size(), WIDTH);
            assert_eq!(store.read(0).unwrap(), PAYLOAD);

            // Appends continue after the recovered size.
            let (_, pos) = store.append(PAYLOAD).unwrap();
            assert_eq!(pos, WIDTH);
            assert_eq!(store.read(pos).unwrap(), PAYLOAD);
        }
    }

    #[test]
    fn store_read_at_streams_raw_bytes() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("0.store")).unwrap();
        store.append(PAYLOAD).unwrap();
        store.append(PAYLOAD).unwrap();

        let mut copied = Vec::new();
        let mut offset = 0u64;
        let mut buf = [0u8; 7];
        loop {
            match store.read_at(&mut buf, offset) {
                Ok(n) => {
                    copied.extend_from_slice(&buf[..n]);
                    offset += n as u64;
                }
                Err(e) if e.is_end_of_data() => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(copied.len() as u64, 2 * WIDTH);
        assert_eq!(&copied[..8], &(PAYLOAD.len() as u64).to_be_bytes());
        assert_eq!(&copied[8..WIDTH as usize], PAYLOAD);
    }

    #[test]
    fn store_read_at_short_read_at_end() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("0.store")).unwrap();
        store.append(PAYLOAD).unwrap();

        let mut buf = [0u8; 64];
        let n = store.read_at(&mut buf, 8).unwrap();
        assert_eq!(n, PAYLOAD.len());
        assert_eq!(&buf[..n], PAYLOAD);
    }

    #[test]
    fn store_empty_payload() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("0.store")).unwrap();

        let (written, pos) = store.append(b"").unwrap();
        assert_eq!((written, pos), (LEN_WIDTH, 0));
        assert!(store.read(0).unwrap().is_empty());
    }

    #[test]
    fn store_flush_and_sync() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.store");
        let store = Store::open(&path).unwrap();
        store.append(PAYLOAD).unwrap();

        store.flush().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), WIDTH);
        assert!(store.sync().is_ok());
    }

    #[test]
    fn store_concurrent_appends_do_not_interleave() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(&dir.path().join("0.store")).unwrap());

        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| store.append(&[t; 16]).unwrap().1)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut positions = Vec::new();
        for handle in handles {
            positions.extend(handle.join().unwrap());
        }
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions.len(), 100);

        for pos in positions {
            let payload = store.read(pos).unwrap();
            assert_eq!(payload.len(), 16);
            assert!(payload.iter().all(|b| *b == payload[0]));
        }
    }

    proptest! {
        #[test]
        fn positions_follow_entry_widths(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..20)
        ) {
            let dir = tempdir().unwrap();
            let store = Store::open(&dir.path().join("0.store")).unwrap();

            let mut expected = 0u64;
            for payload in &payloads {
                let (written, pos) = store.append(payload).unwrap();
                prop_assert_eq!(pos, expected);
                expected += written;
            }
            prop_assert_eq!(store.size(), expected);
        }
    }
}
