//! Benchmark utilities.

use rand::Rng;
use seglog_core::{Config, Record, Segment};
use tempfile::TempDir;

/// Generate random record data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate records with random values of the specified size.
pub fn generate_records(count: usize, value_size: usize) -> Vec<Record> {
    (0..count)
        .map(|_| Record::new(random_data(value_size)))
        .collect()
}

/// Opens a segment in a fresh temporary directory and fills it with
/// `count` records. The directory must outlive the segment.
pub fn populated_segment(count: usize, value_size: usize) -> (TempDir, Segment) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let mut segment =
        Segment::open(dir.path(), 0, Config::default()).expect("Failed to open segment");
    for record in generate_records(count, value_size) {
        segment.append(record).expect("Failed to append");
    }
    (dir, segment)
}
