//! Test fixtures and segment helpers.
//!
//! Provides temporary segment directories, small capacity configs and a
//! one-time tracing subscriber for tests.

use seglog_core::{Config, Record, Segment};
use seglog_storage::ENTRY_WIDTH;
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// The value used by the canonical "hello world" scenarios.
pub const HELLO_WORLD: &[u8] = b"hello world";

/// Installs a test-writer tracing subscriber, once per process.
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=seglog_core=trace`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A config whose index holds exactly `entries` entries.
#[must_use]
pub fn config_with_index_entries(entries: u64) -> Config {
    Config::new()
        .max_store_bytes(1024 * 1024)
        .max_index_bytes(entries * ENTRY_WIDTH)
}

/// A segment in a temporary directory that is deleted on drop.
pub struct TestSegment {
    /// The open segment, `None` only while being reopened.
    segment: Option<Segment>,
    base_offset: u64,
    config: Config,
    dir: TempDir,
}

impl TestSegment {
    /// Opens a fresh segment with the given base offset and config.
    pub fn new(base_offset: u64, config: Config) -> Self {
        init_tracing();
        let dir = TempDir::new().expect("Failed to create temp directory");
        let segment =
            Segment::open(dir.path(), base_offset, config).expect("Failed to open segment");

        Self {
            segment: Some(segment),
            base_offset,
            config,
            dir,
        }
    }

    /// Opens a fresh segment with the default config.
    pub fn with_base_offset(base_offset: u64) -> Self {
        Self::new(base_offset, Config::default())
    }

    /// Returns the directory holding the segment files.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Closes the segment and opens it again from disk.
    pub fn reopen(&mut self) {
        self.reopen_with(self.config);
    }

    /// Closes the segment and opens it again with a different config.
    pub fn reopen_with(&mut self, config: Config) {
        if let Some(segment) = self.segment.take() {
            segment.close().expect("Failed to close segment");
        }
        self.config = config;
        self.segment = Some(
            Segment::open(self.dir.path(), self.base_offset, config)
                .expect("Failed to reopen segment"),
        );
    }

    /// Removes the segment files and opens an empty segment in their place.
    pub fn remove_and_reopen(&mut self) {
        if let Some(segment) = self.segment.take() {
            segment.remove().expect("Failed to remove segment");
        }
        self.reopen_with(self.config);
    }

    /// Appends `count` copies of `value`, returning the assigned offsets.
    pub fn append_values(&mut self, value: &[u8], count: usize) -> Vec<u64> {
        (0..count)
            .map(|_| {
                self.append(Record::new(value.to_vec()))
                    .expect("Failed to append")
            })
            .collect()
    }

    /// Takes the segment out of the fixture; the directory stays alive.
    pub fn take(&mut self) -> Segment {
        self.segment.take().expect("Segment already taken")
    }
}

impl std::ops::Deref for TestSegment {
    type Target = Segment;

    fn deref(&self) -> &Self::Target {
        self.segment.as_ref().expect("Segment already taken")
    }
}

impl std::ops::DerefMut for TestSegment {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.segment.as_mut().expect("Segment already taken")
    }
}

/// Runs a test against a temporary segment.
///
/// # Example
///
/// ```rust
/// use seglog_testkit::with_temp_segment;
/// use seglog_core::Record;
///
/// with_temp_segment(16, |segment| {
///     assert_eq!(segment.append(Record::new(b"x".to_vec())).unwrap(), 16);
/// });
/// ```
pub fn with_temp_segment<F, R>(base_offset: u64, f: F) -> R
where
    F: FnOnce(&mut Segment) -> R,
{
    let mut test_segment = TestSegment::with_base_offset(base_offset);
    f(&mut test_segment)
}
