//! Content addressing for course documents.

use coursepilot_shared::SearchableFields;
use sha2::{Digest, Sha256};

/// Stable identifier for a document with these searchable fields.
///
/// SHA-256 over the fields in sorted key order, each entry encoded as
/// `key NUL len(value) value` so no two distinct field sets share an
/// encoding. Identical content always yields the same id; that collision is
/// what makes re-ingestion idempotent.
pub fn document_id(fields: &SearchableFields) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in fields.to_sorted_map() {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
