//! Deterministic chunk identifiers.
//!
//! Re-indexing the same folder must produce the same ids so that upserts
//! replace chunks in place instead of duplicating them.

use md5::{Digest, Md5};

/// `chunk_<first 16 hex chars of md5(source + "_" + index)>`
#[must_use]
pub fn compute_chunk_id(source: &str, index: usize) -> String {
    let payload = format!("{source}_{index}");
    let mut hasher = Md5::new();
    hasher.update(payload.as_bytes());
    let digest = hasher.finalize();
    let full_hex = hex::encode(digest);
    format!("chunk_{}", &full_hex[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_id() {
        let a = compute_chunk_id("/repo/src/main.rs", 3);
        let b = compute_chunk_id("/repo/src/main.rs", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn different_index_changes_id() {
        let a = compute_chunk_id("/repo/src/main.rs", 0);
        let b = compute_chunk_id("/repo/src/main.rs", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn id_has_expected_shape() {
        let id = compute_chunk_id("x", 0);
        assert!(id.starts_with("chunk_"));
        assert_eq!(id.len(), "chunk_".len() + 16);
    }
}
