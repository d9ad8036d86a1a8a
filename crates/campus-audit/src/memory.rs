//! In-memory implementation of `AuditLedger`.
//!
//! `InMemoryAuditLedger` keeps every event in a `Vec` behind a `Mutex`. The
//! vector index of an event equals its sequence number, which is what makes
//! the stateless cursors in `cursor` cheap to resume from.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use campus_contracts::{
    audit::{AuditEntryId, AuditLogEntry, AuditPage, AuditQuery, NewAuditEntry, SortOrder},
    error::{CampusError, CampusResult},
};
use campus_core::traits::AuditLedger;

use crate::{
    chain::{hash_entry, verify_chain},
    cursor,
    event::{LedgerEvent, LedgerExport},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct LedgerState {
    /// Every event in append order; `events[i].entry.sequence == i`.
    pub(crate) events: Vec<LedgerEvent>,

    /// `this_hash` of the last event, or `GENESIS_HASH`.
    pub(crate) last_hash: String,

    /// Timestamp of the last event. New stamps never go below it.
    pub(crate) last_created_at: Option<DateTime<Utc>>,
}

// ── Public ledger ─────────────────────────────────────────────────────────────

/// An in-memory, append-only audit ledger backed by a SHA-256 hash chain.
///
/// `append` and `query` each take the internal lock once, so concurrent
/// appenders are serialized and a query always sees a consistent prefix.
pub struct InMemoryAuditLedger {
    pub(crate) state: Mutex<LedgerState>,
    offline: AtomicBool,
}

impl InMemoryAuditLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                events: Vec::new(),
                last_hash: LedgerEvent::GENESIS_HASH.to_string(),
                last_created_at: None,
            }),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate the backing store becoming unreachable.
    ///
    /// While offline every `append` fails with `AuditWriteFailed`; queries
    /// keep working against what was already written.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        warn!(offline, "audit ledger availability changed");
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry in append order.
    pub fn entries(&self) -> CampusResult<Vec<AuditLogEntry>> {
        Ok(self.lock()?.events.iter().map(|e| e.entry.clone()).collect())
    }

    /// Export a snapshot of the chain.
    pub fn export(&self) -> CampusResult<LedgerExport> {
        let state = self.lock()?;
        let terminal_hash = state
            .events
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        Ok(LedgerExport {
            events: state.events.clone(),
            exported_at: Utc::now(),
            terminal_hash,
        })
    }

    /// Verify that no stored entry has been altered, removed, or reordered.
    pub fn verify_integrity(&self) -> bool {
        match self.lock() {
            Ok(state) => verify_chain(&state.events),
            Err(_) => false,
        }
    }

    fn lock(&self) -> CampusResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|e| CampusError::AuditWriteFailed {
            reason: format!("audit ledger lock poisoned: {}", e),
        })
    }
}

impl Default for InMemoryAuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Take up to `page_size` matching entries; report whether more remain.
fn collect_page<'a>(
    events: impl Iterator<Item = &'a LedgerEvent>,
    query: &AuditQuery,
) -> (Vec<AuditLogEntry>, bool) {
    let mut matching = events
        .map(|e| &e.entry)
        .filter(|entry| query.matches(entry))
        .take(query.page_size + 1)
        .cloned()
        .collect::<Vec<_>>();

    let more = matching.len() > query.page_size;
    matching.truncate(query.page_size);
    (matching, more)
}

// ── AuditLedger impl ──────────────────────────────────────────────────────────

impl AuditLedger for InMemoryAuditLedger {
    /// Stamp the entry with an id, the next sequence number, and a
    /// `created_at` no earlier than the previous entry's, then link it into
    /// the chain.
    fn append(&self, entry: NewAuditEntry) -> CampusResult<AuditLogEntry> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CampusError::AuditWriteFailed {
                reason: "audit ledger is offline".to_string(),
            });
        }

        let mut state = self.lock()?;

        let now = Utc::now();
        let created_at = state.last_created_at.map_or(now, |last| last.max(now));

        let stored = AuditLogEntry {
            id: AuditEntryId::new(),
            sequence: state.events.len() as u64,
            actor_id: entry.actor_id,
            actor_role: entry.actor_role,
            action_type: entry.action_type,
            target_type: entry.target_type,
            target_id: entry.target_id,
            created_at,
            detail: entry.detail,
        };

        let prev_hash = state.last_hash.clone();
        let this_hash = hash_entry(&stored, &prev_hash)?;

        state.events.push(LedgerEvent {
            entry: stored.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;
        state.last_created_at = Some(created_at);

        debug!(
            sequence = stored.sequence,
            action = %stored.action_type,
            actor_id = %stored.actor_id,
            target_id = %stored.target_id,
            "audit entry appended"
        );

        Ok(stored)
    }

    fn query(&self, query: &AuditQuery) -> CampusResult<AuditPage> {
        if query.page_size == 0 || query.page_size > AuditQuery::MAX_PAGE_SIZE {
            return Err(CampusError::validation(format!(
                "page_size must be between 1 and {}, got {}",
                AuditQuery::MAX_PAGE_SIZE,
                query.page_size
            )));
        }

        let cursor = query
            .page_token
            .as_deref()
            .map(|token| cursor::decode(token, query.order))
            .transpose()?;

        let state = self.lock()?;
        let len = state.events.len();

        let (entries, more) = match query.order {
            SortOrder::Descending => {
                let end = cursor.map_or(len, |c| usize::try_from(c).map_or(len, |c| c.min(len)));
                collect_page(state.events[..end].iter().rev(), query)
            }
            SortOrder::Ascending => {
                let start = cursor.map_or(0, |c| {
                    usize::try_from(c.saturating_add(1)).map_or(len, |s| s.min(len))
                });
                collect_page(state.events[start..].iter(), query)
            }
        };

        let next_page_token = match (more, entries.last()) {
            (true, Some(last)) => Some(cursor::encode(query.order, last.sequence)),
            _ => None,
        };

        debug!(
            returned = entries.len(),
            has_more = next_page_token.is_some(),
            "audit query served"
        );

        Ok(AuditPage {
            entries,
            next_page_token,
        })
    }
}
