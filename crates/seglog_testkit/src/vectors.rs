//! On-disk format vectors.
//!
//! These pin the exact bytes of store and index files so a format change
//! never slips in unnoticed. Bytes are hex-encoded for readability.

/// A known input and the bytes it must produce on disk.
#[derive(Debug, Clone)]
pub struct FormatVector {
    /// Unique identifier for this vector.
    pub id: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Base offset of the segment the records go into.
    pub base_offset: u64,
    /// Record values appended in order.
    pub values: &'static [&'static [u8]],
    /// Expected store file contents (hex).
    pub store_hex: &'static str,
    /// Expected index file contents after close (hex).
    pub index_hex: &'static str,
}

/// Segment format vectors.
pub fn segment_format_vectors() -> Vec<FormatVector> {
    vec![
        FormatVector {
            id: "empty_segment",
            description: "No appends: both files empty after close",
            base_offset: 0,
            values: &[],
            store_hex: "",
            index_hex: "",
        },
        FormatVector {
            id: "single_record_base_0",
            description: "Offset 0 is a default proto3 field and is omitted",
            base_offset: 0,
            values: &[b"hi"],
            // len 4 | 0a 02 'h' 'i'
            store_hex: "00000000000000040a026869",
            // rel 0 | pos 0
            index_hex: "000000000000000000000000",
        },
        FormatVector {
            id: "two_records_base_16",
            description: "Offsets 16 and 17 encoded as varints after the value",
            base_offset: 16,
            values: &[b"a", b"b"],
            // len 5 | 0a 01 'a' 10 10, len 5 | 0a 01 'b' 10 11
            store_hex: "00000000000000050a0161101000000000000000050a01621011",
            // rel 0 | pos 0, rel 1 | pos 13
            index_hex: "00000000000000000000000000000001000000000000000d",
        },
    ]
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes lowercase or uppercase hex; `None` on odd length or bad digits.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = [0x00, 0x0a, 0xff];
        assert_eq!(hex_encode(&bytes), "000aff");
        assert_eq!(hex_decode("000aFF").unwrap(), bytes);
        assert!(hex_decode("abc").is_none());
        assert!(hex_decode("zz").is_none());
    }

    #[test]
    fn vectors_are_valid_hex() {
        for vector in segment_format_vectors() {
            assert!(hex_decode(vector.store_hex).is_some(), "{}", vector.id);
            assert!(hex_decode(vector.index_hex).is_some(), "{}", vector.id);
        }
    }
}
