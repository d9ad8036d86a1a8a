//! Audit ledger entry and query types.
//!
//! `NewAuditEntry` is what callers hand to the ledger. The ledger stamps it
//! with an id, a sequence number, and a creation time, producing an immutable
//! `AuditLogEntry`. There is no type for updating or deleting an entry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::{Principal, PrincipalId};

/// Unique identifier of a stored audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub uuid::Uuid);

impl AuditEntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed set of accountable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Marked,
    Edited,
    BulkMarked,
    ProxyDetected,
    Deleted,
    SessionLocked,
    UpdateStatus,
    UpdateRole,
    DeleteUser,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Marked => "marked",
            ActionType::Edited => "edited",
            ActionType::BulkMarked => "bulk_marked",
            ActionType::ProxyDetected => "proxy_detected",
            ActionType::Deleted => "deleted",
            ActionType::SessionLocked => "session_locked",
            ActionType::UpdateStatus => "update_status",
            ActionType::UpdateRole => "update_role",
            ActionType::DeleteUser => "delete_user",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of object an entry's `target_id` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Principal,
    AttendanceRecord,
    AttendanceSession,
}

/// An audit entry before the ledger has stamped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub actor_id: PrincipalId,
    /// The actor's primary role at the time of the action.
    pub actor_role: String,
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: String,
    /// Structured detail, e.g. `{"old_status": "active", "new_status": "inactive"}`.
    pub detail: serde_json::Value,
}

impl NewAuditEntry {
    /// Start an entry on behalf of `actor`, capturing its current role.
    pub fn by(
        actor: &Principal,
        action_type: ActionType,
        target_type: TargetType,
        target_id: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            actor_id: actor.id.clone(),
            actor_role: actor.role_label(),
            action_type,
            target_type,
            target_id: target_id.into(),
            detail,
        }
    }
}

/// An immutable, stored audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    /// Position in the ledger, starting at 0. Breaks `created_at` ties.
    pub sequence: u64,
    pub actor_id: PrincipalId,
    pub actor_role: String,
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
    pub detail: serde_json::Value,
}

/// Result ordering for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Descending,
    Ascending,
}

/// Filters for `AuditLedger::query`. All present filters must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub action_type: Option<ActionType>,
    /// Inclusive lower bound on `created_at`.
    pub date_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub date_to: Option<DateTime<Utc>>,
    pub actor_id: Option<PrincipalId>,
    pub target_id: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    /// Opaque cursor returned as `next_page_token` by a previous page.
    pub page_token: Option<String>,
    pub page_size: usize,
}

impl AuditQuery {
    /// The largest page a single query may request.
    pub const MAX_PAGE_SIZE: usize = 500;

    /// An unfiltered, newest-first query.
    pub fn page(page_size: usize) -> Self {
        Self {
            action_type: None,
            date_from: None,
            date_to: None,
            actor_id: None,
            target_id: None,
            order: SortOrder::Descending,
            page_token: None,
            page_size,
        }
    }

    pub fn action(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    pub fn actor(mut self, actor_id: PrincipalId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn after(mut self, page_token: Option<String>) -> Self {
        self.page_token = page_token;
        self
    }

    /// True if `entry` passes every present filter.
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.action_type.map_or(true, |a| a == entry.action_type)
            && self.date_from.map_or(true, |from| entry.created_at >= from)
            && self.date_to.map_or(true, |to| entry.created_at < to)
            && self.actor_id.as_ref().map_or(true, |a| *a == entry.actor_id)
            && self.target_id.as_ref().map_or(true, |t| *t == entry.target_id)
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    /// Present when more matching entries may follow.
    pub next_page_token: Option<String>,
}
