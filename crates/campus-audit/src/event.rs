//! Ledger event and export types.
//!
//! `LedgerEvent` is a single link in the hash chain: a stored
//! `AuditLogEntry` plus the SHA-256 hashes that make tampering detectable.
//! `LedgerExport` is a point-in-time snapshot of the whole chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campus_contracts::audit::AuditLogEntry;

/// One stored entry and its place in the hash chain.
///
/// Modifying any field of `entry` invalidates `this_hash` and every later
/// `prev_hash`, which `verify_chain` detects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub entry: AuditLogEntry,

    /// `this_hash` of the previous event, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// SHA-256 (hex) over `prev_hash` and the canonical JSON of `entry`.
    pub this_hash: String,
}

impl LedgerEvent {
    /// The `prev_hash` of the first event in every ledger: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of the ledger, in append order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub events: Vec<LedgerEvent>,

    pub exported_at: DateTime<Utc>,

    /// The `this_hash` of the last event; empty for an empty ledger.
    pub terminal_hash: String,
}
