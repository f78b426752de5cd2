//! Property-based test generators using proptest.
//!
//! Provides strategies for records and segment parameters.

use proptest::prelude::*;
use seglog_core::Record;

/// Strategy for record values, including empty ones.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for records with arbitrary metadata and a junk offset that
/// the segment must overwrite.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (value_strategy(), any::<u64>(), any::<u64>(), any::<u32>()).prop_map(
        |(value, offset, term, record_type)| {
            let mut record = Record::new(value)
                .with_term(term)
                .with_record_type(record_type);
            record.offset = offset;
            record
        },
    )
}

/// Strategy for a batch of records to append to one segment.
pub fn record_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(), 1..=max_len)
}

/// Strategy for base offsets, biased towards small and large values.
pub fn base_offset_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        0u64..1_000,
        (u64::MAX / 2)..(u64::MAX / 2 + 1_000),
    ]
}
