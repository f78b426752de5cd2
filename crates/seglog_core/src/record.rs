//! The record type stored in segments.
//!
//! Records are Protocol Buffers messages. Field tags are part of the
//! on-disk format and must never be renumbered; new fields take new tags
//! so old segments stay readable.

use crate::error::CoreResult;
use prost::Message;

/// A single entry of the commit log.
#[derive(Clone, PartialEq, Message)]
pub struct Record {
    /// Opaque payload.
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,

    /// Absolute offset, assigned by the segment on append.
    #[prost(uint64, tag = "2")]
    pub offset: u64,

    /// Consensus term the record was written in, if any.
    #[prost(uint64, tag = "3")]
    pub term: u64,

    /// Application-defined record kind.
    #[prost(uint32, tag = "4")]
    pub record_type: u32,
}

impl Record {
    /// Creates a record carrying `value`.
    #[must_use]
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Sets the consensus term.
    #[must_use]
    pub fn with_term(mut self, term: u64) -> Self {
        self.term = term;
        self
    }

    /// Sets the record kind.
    #[must_use]
    pub fn with_record_type(mut self, record_type: u32) -> Self {
        self.record_type = record_type;
        self
    }

    /// Serializes the record into a store payload.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Parses a store payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Decode`] if the bytes are not a record.
    pub fn from_payload(payload: &[u8]) -> CoreResult<Self> {
        Ok(Self::decode(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn payload_uses_stable_tags() {
        let mut record = Record::new(b"hi".to_vec());
        record.offset = 5;

        // tag 1 (len-delimited), tag 2 (varint); zero fields are omitted.
        assert_eq!(record.to_payload(), [0x0a, 2, b'h', b'i', 0x10, 5]);
    }

    #[test]
    fn metadata_survives_payload() {
        let record = Record::new(b"value".to_vec())
            .with_term(7)
            .with_record_type(2);

        let decoded = Record::from_payload(&record.to_payload()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let mut payload = Record::new(b"v1".to_vec()).to_payload();
        // Field 15, varint 1: written by a newer schema.
        payload.extend_from_slice(&[0x78, 0x01]);

        let decoded = Record::from_payload(&payload).unwrap();
        assert_eq!(decoded.value, b"v1");
    }

    #[test]
    fn truncated_payload_fails() {
        let result = Record::from_payload(&[0x0a, 5, b'h']);
        assert!(matches!(result, Err(CoreError::Decode(_))));
    }
}
