//! # campus-audit
//!
//! Immutable, append-only, SHA-256 hash-chained audit ledger for the campus
//! accountability core.
//!
//! ## Overview
//!
//! Every accountable action is stored as an `AuditLogEntry` wrapped in a
//! `LedgerEvent` that links to the previous event via its SHA-256 hash.
//! Tampering with any stored entry breaks the chain and is detected by
//! `verify_chain`. There is no update or delete path.
//!
//! Queries filter with logical AND, order by creation time (newest first by
//! default), and paginate with stateless cursors that stay correct while
//! other callers keep appending.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use campus_audit::InMemoryAuditLedger;
//! use campus_core::traits::AuditLedger;
//!
//! let ledger = InMemoryAuditLedger::new();
//! ledger.append(entry)?;
//! let page = ledger.query(&AuditQuery::page(50))?;
//! assert!(ledger.verify_integrity());
//! ```

pub mod chain;
pub mod cursor;
pub mod event;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use event::{LedgerEvent, LedgerExport};
pub use memory::InMemoryAuditLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Duration;
    use serde_json::json;

    use campus_contracts::{
        audit::{ActionType, AuditQuery, NewAuditEntry, SortOrder, TargetType},
        error::CampusError,
        principal::PrincipalId,
    };
    use campus_core::traits::AuditLedger;

    use super::{InMemoryAuditLedger, LedgerEvent};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn entry(action: ActionType, actor: &str, target: &str) -> NewAuditEntry {
        NewAuditEntry {
            actor_id: PrincipalId::new(actor),
            actor_role: "admin".to_string(),
            action_type: action,
            target_type: TargetType::Principal,
            target_id: target.to_string(),
            detail: json!({ "old_status": "active", "new_status": "inactive" }),
        }
    }

    /// A ledger with `n` `update_status` entries targeting `t-0`, `t-1`, ...
    fn ledger_with(n: usize) -> InMemoryAuditLedger {
        let ledger = InMemoryAuditLedger::new();
        for i in 0..n {
            ledger
                .append(entry(ActionType::UpdateStatus, "admin-1", &format!("t-{i}")))
                .unwrap();
        }
        ledger
    }

    fn targets(page: &campus_contracts::audit::AuditPage) -> Vec<String> {
        page.entries.iter().map(|e| e.target_id.clone()).collect()
    }

    // ── 1. Chain ──────────────────────────────────────────────────────────────

    #[test]
    fn test_hash_chain_integrity() {
        let ledger = ledger_with(3);
        assert!(ledger.verify_integrity(), "chain must be valid after sequential appends");
    }

    /// Rewriting the detail of a stored entry breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let ledger = ledger_with(3);

        {
            let mut state = ledger.state.lock().unwrap();
            state.events[1].entry.detail = json!({ "old_status": "suspended" });
        }

        assert!(!ledger.verify_integrity(), "chain must detect an edited entry");
    }

    /// Dropping an entry from the middle breaks the chain.
    #[test]
    fn test_removal_detection() {
        let ledger = ledger_with(3);

        {
            let mut state = ledger.state.lock().unwrap();
            state.events.remove(1);
        }

        assert!(!ledger.verify_integrity(), "chain must detect a removed entry");
    }

    #[test]
    fn test_genesis_hash_and_export() {
        let ledger = ledger_with(2);
        let export = ledger.export().unwrap();

        assert_eq!(export.events[0].prev_hash, LedgerEvent::GENESIS_HASH);
        assert_eq!(export.terminal_hash, export.events[1].this_hash);
        assert!(super::verify_chain(&export.events));
        assert!(super::verify_chain(&[]), "an empty chain is valid");
    }

    /// The ledger stamps ids, contiguous sequences, and non-decreasing times.
    #[test]
    fn test_append_stamps_entries() {
        let ledger = ledger_with(5);
        let entries = ledger.entries().unwrap();

        let ids: HashSet<_> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 5, "ids must be unique");

        for (idx, e) in entries.iter().enumerate() {
            assert_eq!(e.sequence, idx as u64);
        }
        for pair in entries.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    /// Appends from many threads serialize into one contiguous, valid chain.
    #[test]
    fn test_concurrent_appends() {
        let ledger = InMemoryAuditLedger::new();

        std::thread::scope(|s| {
            for t in 0..4 {
                let ledger = &ledger;
                s.spawn(move || {
                    for i in 0..25 {
                        let actor = format!("teacher-{t}");
                        ledger
                            .append(entry(ActionType::Marked, &actor, &format!("r-{i}")))
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(ledger.len(), 100);
        assert!(ledger.verify_integrity());
    }

    /// An offline ledger refuses writes but still serves reads.
    #[test]
    fn test_offline_ledger_rejects_appends() {
        let ledger = ledger_with(1);
        ledger.set_offline(true);

        let result = ledger.append(entry(ActionType::DeleteUser, "admin-1", "t-9"));
        assert!(matches!(result, Err(CampusError::AuditWriteFailed { .. })));
        assert_eq!(ledger.query(&AuditQuery::page(10)).unwrap().entries.len(), 1);

        ledger.set_offline(false);
        assert!(ledger.append(entry(ActionType::DeleteUser, "admin-1", "t-9")).is_ok());
    }

    // ── 2. Query ──────────────────────────────────────────────────────────────

    #[test]
    fn test_query_defaults_to_newest_first() {
        let ledger = ledger_with(3);
        let page = ledger.query(&AuditQuery::page(10)).unwrap();

        assert_eq!(targets(&page), vec!["t-2", "t-1", "t-0"]);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_query_ascending() {
        let ledger = ledger_with(3);
        let page = ledger
            .query(&AuditQuery::page(10).ordered(SortOrder::Ascending))
            .unwrap();

        assert_eq!(targets(&page), vec!["t-0", "t-1", "t-2"]);
    }

    #[test]
    fn test_query_filters_combine_with_and() {
        let ledger = InMemoryAuditLedger::new();
        ledger.append(entry(ActionType::UpdateStatus, "admin-1", "a")).unwrap();
        ledger.append(entry(ActionType::UpdateRole, "admin-1", "b")).unwrap();
        ledger.append(entry(ActionType::UpdateStatus, "hod-cse", "c")).unwrap();
        ledger.append(entry(ActionType::UpdateStatus, "admin-1", "d")).unwrap();

        let page = ledger
            .query(
                &AuditQuery::page(10)
                    .action(ActionType::UpdateStatus)
                    .actor(PrincipalId::new("admin-1")),
            )
            .unwrap();
        assert_eq!(targets(&page), vec!["d", "a"]);

        let page = ledger.query(&AuditQuery::page(10).target("c")).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].actor_id, PrincipalId::new("hod-cse"));
    }

    #[test]
    fn test_query_date_range() {
        let ledger = ledger_with(3);
        let entries = ledger.entries().unwrap();
        let first = entries[0].created_at;

        let none = ledger
            .query(&AuditQuery::page(10).between(None, Some(first)))
            .unwrap();
        assert!(none.entries.is_empty(), "date_to is exclusive");

        let all = ledger
            .query(&AuditQuery::page(10).between(Some(first), Some(first + Duration::hours(1))))
            .unwrap();
        assert_eq!(all.entries.len(), 3);
    }

    // ── 3. Pagination ─────────────────────────────────────────────────────────

    /// Walking every page visits every entry exactly once.
    #[test]
    fn test_pagination_walks_every_entry() {
        let ledger = ledger_with(5);

        let mut seen = Vec::new();
        let mut token = None;
        loop {
            let page = ledger.query(&AuditQuery::page(2).after(token)).unwrap();
            assert!(page.entries.len() <= 2);
            seen.extend(targets(&page));
            token = page.next_page_token;
            if token.is_none() {
                break;
            }
        }

        assert_eq!(seen, vec!["t-4", "t-3", "t-2", "t-1", "t-0"]);
    }

    /// An exactly full last page does not hand out a dangling token.
    #[test]
    fn test_no_token_when_nothing_follows() {
        let ledger = ledger_with(4);
        let first = ledger.query(&AuditQuery::page(2)).unwrap();
        let second = ledger
            .query(&AuditQuery::page(2).after(first.next_page_token))
            .unwrap();

        assert_eq!(targets(&second), vec!["t-1", "t-0"]);
        assert!(second.next_page_token.is_none());
    }

    /// Entries appended between page requests neither repeat nor displace
    /// entries on later pages.
    #[test]
    fn test_pagination_is_stable_under_concurrent_appends() {
        let ledger = ledger_with(4);

        let first = ledger.query(&AuditQuery::page(2)).unwrap();
        assert_eq!(targets(&first), vec!["t-3", "t-2"]);

        ledger.append(entry(ActionType::UpdateStatus, "admin-1", "late-1")).unwrap();
        ledger.append(entry(ActionType::UpdateStatus, "admin-1", "late-2")).unwrap();

        let second = ledger
            .query(&AuditQuery::page(2).after(first.next_page_token))
            .unwrap();
        assert_eq!(targets(&second), vec!["t-1", "t-0"]);
    }

    #[test]
    fn test_ascending_cursor_resumes_past_last_entry() {
        let ledger = ledger_with(3);
        let q = AuditQuery::page(2).ordered(SortOrder::Ascending);

        let first = ledger.query(&q).unwrap();
        let second = ledger.query(&q.clone().after(first.next_page_token.clone())).unwrap();

        assert_eq!(targets(&first), vec!["t-0", "t-1"]);
        assert_eq!(targets(&second), vec!["t-2"]);
    }

    #[test]
    fn test_malformed_token_is_validation_error() {
        let ledger = ledger_with(1);

        for token in ["zz-not-hex", "6e6f2d636f6c6f6e", "646573633a616263"] {
            let result = ledger.query(&AuditQuery::page(10).after(Some(token.to_string())));
            assert!(
                matches!(result, Err(CampusError::ValidationError { .. })),
                "token {token} should be rejected"
            );
        }
    }

    #[test]
    fn test_token_for_other_order_is_rejected() {
        let ledger = ledger_with(3);
        let first = ledger.query(&AuditQuery::page(1)).unwrap();

        let result = ledger.query(
            &AuditQuery::page(1)
                .ordered(SortOrder::Ascending)
                .after(first.next_page_token),
        );
        assert!(matches!(result, Err(CampusError::ValidationError { .. })));
    }

    #[test]
    fn test_page_size_bounds() {
        let ledger = ledger_with(1);

        assert!(matches!(
            ledger.query(&AuditQuery::page(0)),
            Err(CampusError::ValidationError { .. })
        ));
        assert!(matches!(
            ledger.query(&AuditQuery::page(AuditQuery::MAX_PAGE_SIZE + 1)),
            Err(CampusError::ValidationError { .. })
        ));
        assert!(ledger.query(&AuditQuery::page(AuditQuery::MAX_PAGE_SIZE)).is_ok());
    }
}
