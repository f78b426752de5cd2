//! Offset arithmetic and segment file naming.

/// Extension of a segment's store file.
pub const STORE_EXTENSION: &str = "store";
/// Extension of a segment's index file.
pub const INDEX_EXTENSION: &str = "index";

/// Returns the store file name for a segment, `<base_offset>.store`.
#[must_use]
pub fn store_file_name(base_offset: u64) -> String {
    format!("{base_offset}.{STORE_EXTENSION}")
}

/// Returns the index file name for a segment, `<base_offset>.index`.
#[must_use]
pub fn index_file_name(base_offset: u64) -> String {
    format!("{base_offset}.{INDEX_EXTENSION}")
}

/// Extracts the base offset from a store or index file name.
///
/// Returns `None` for any other file.
#[must_use]
pub fn parse_base_offset(file_name: &str) -> Option<u64> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if ext != STORE_EXTENSION && ext != INDEX_EXTENSION {
        return None;
    }
    stem.parse().ok()
}

/// Converts an absolute offset into one relative to `base_offset`.
///
/// Returns `None` if `offset` is below the base or too far above it for a
/// 4-byte index field.
#[must_use]
pub fn relative_offset(base_offset: u64, offset: u64) -> Option<u32> {
    offset
        .checked_sub(base_offset)
        .and_then(|rel| u32::try_from(rel).ok())
}

/// Returns the largest multiple of `k` that is not above `j`.
///
/// Used to align a byte length down to whole entries. `k == 0` returns `j`.
#[must_use]
pub fn nearest_multiple(j: u64, k: u64) -> u64 {
    j.checked_div(k).map_or(j, |q| q * k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(store_file_name(16), "16.store");
        assert_eq!(index_file_name(0), "0.index");
    }

    #[test]
    fn parse_file_names() {
        assert_eq!(parse_base_offset("16.store"), Some(16));
        assert_eq!(parse_base_offset("42.index"), Some(42));
        assert_eq!(parse_base_offset("42.log"), None);
        assert_eq!(parse_base_offset("abc.store"), None);
        assert_eq!(parse_base_offset("store"), None);
    }

    #[test]
    fn relative_offsets() {
        assert_eq!(relative_offset(16, 16), Some(0));
        assert_eq!(relative_offset(16, 18), Some(2));
        assert_eq!(relative_offset(16, 15), None);
        assert_eq!(relative_offset(0, u64::from(u32::MAX) + 1), None);
    }

    #[test]
    fn nearest_multiples() {
        assert_eq!(nearest_multiple(37, 12), 36);
        assert_eq!(nearest_multiple(36, 12), 36);
        assert_eq!(nearest_multiple(11, 12), 0);
        assert_eq!(nearest_multiple(9, 0), 9);
    }
}
