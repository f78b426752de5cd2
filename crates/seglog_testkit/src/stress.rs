//! Stress tests for SegLog segments.
//!
//! These exercise segments under sustained and concurrent load.

use seglog_core::{Record, Segment, SharedSegment};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Size of each record value in bytes.
    pub value_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            value_size: 256,
        }
    }
}

/// Run a sequential append stress test.
///
/// Stops counting successes once the segment reports end-of-capacity;
/// every later append is a failure.
pub fn stress_sequential_appends(segment: &mut Segment, config: &StressConfig) -> StressTestResult {
    let value = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for _ in 0..config.operations {
        match segment.append(Record::new(value.clone())) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a sequential read stress test over everything in the segment.
pub fn stress_sequential_reads(segment: &Segment, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    if segment.is_empty() {
        return StressTestResult::new(0, config.operations, start.elapsed());
    }

    for i in 0..config.operations {
        let offset = segment.base_offset() + (i as u64 % segment.len());
        match segment.read(offset) {
            Ok(record) if record.offset == offset => successful += 1,
            _ => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent append and read stress test.
///
/// Half the threads append, the other half read back offsets below the
/// current `next_offset`; every record read must carry its own offset.
pub fn stress_concurrent_mixed(segment: &SharedSegment, config: &StressConfig) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let ops_per_thread = config.operations / config.threads.max(1);
    let value = vec![0xCDu8; config.value_size];

    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..config.threads {
            let successful = &successful;
            let failed = &failed;
            let value = &value;

            scope.spawn(move || {
                for i in 0..ops_per_thread {
                    let ok = if t % 2 == 0 {
                        segment.append(Record::new(value.clone())).is_ok()
                    } else {
                        let base = segment.base_offset();
                        let len = segment.next_offset() - base;
                        if len == 0 {
                            true
                        } else {
                            let offset = base + (i as u64 % len);
                            matches!(segment.read(offset), Ok(r) if r.offset == offset)
                        }
                    };

                    let counter = if ok { successful } else { failed };
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
