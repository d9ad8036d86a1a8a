//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the entry (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use campus_contracts::{
    audit::AuditLogEntry,
    error::{CampusError, CampusResult},
};

use crate::event::LedgerEvent;

/// Compute the SHA-256 hash linking `entry` to `prev_hash`.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(entry: &AuditLogEntry, prev_hash: &str) -> CampusResult<String> {
    let entry_json = serde_json::to_vec(entry).map_err(|e| CampusError::AuditWriteFailed {
        reason: format!("audit entry is not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(entry.sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&entry_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Valid when every event's `prev_hash` equals the previous event's
/// `this_hash` (or `GENESIS_HASH` for the first), every `this_hash` matches
/// the value recomputed from the event, and sequences are contiguous from 0.
/// An empty chain is valid.
pub fn verify_chain(events: &[LedgerEvent]) -> bool {
    let mut expected_prev = LedgerEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.entry.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_entry(&event.entry, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
