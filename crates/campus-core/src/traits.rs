//! Core trait definitions for the campus accountability core.
//!
//! These four traits define the trust boundary:
//!
//! - `PermissionOracle` — trusted, read-only view of the role catalogue
//! - `AuditLedger`      — trusted, append-only sink for accountable actions
//! - `PrincipalStore`   — persistence for principal accounts
//! - `AttendanceStore`  — persistence for sessions and records
//!
//! The gateway and the attendance state machine wire them together.
//! Neither ever reads an actor from ambient state: every call names it.

use campus_contracts::{
    attendance::{
        AttendanceRecord, AttendanceSession, ClassScope, RecordWrite, SessionId, SessionKey,
        SessionRef, StudentId,
    },
    audit::{AuditLogEntry, AuditPage, AuditQuery, NewAuditEntry},
    error::CampusResult,
    mutation::{AccountMutation, AppliedMutation, Durability},
    permission::PermissionDecision,
    principal::{Principal, PrincipalId, RoleName},
};

/// Answers what an actor may do.
///
/// Implementations must be side-effect free and fast; both the gateway and
/// the attendance state machine call this on every request.
pub trait PermissionOracle: Send + Sync {
    /// Decide whether `actor` holds `permission`, and at what scope.
    ///
    /// An unknown permission name yields `Deny` with a "permission not found"
    /// reason rather than an error.
    fn check(&self, actor: &Principal, permission: &str) -> PermissionDecision;

    /// True if `role` names a role in the catalogue.
    fn role_exists(&self, role: &RoleName) -> bool;
}

/// The audit ledger: the immutable record of accountable actions.
///
/// There is deliberately no update or delete method.
pub trait AuditLedger: Send + Sync {
    /// Stamp and append one entry, returning the stored form.
    fn append(&self, entry: NewAuditEntry) -> CampusResult<AuditLogEntry>;

    /// Return one page of entries matching every filter in `query`.
    fn query(&self, query: &AuditQuery) -> CampusResult<AuditPage>;
}

/// Persistence for principal accounts and their role assignments.
pub trait PrincipalStore: Send + Sync {
    fn get(&self, id: &PrincipalId) -> CampusResult<Option<Principal>>;

    /// Whether `apply_audited` commits the mutation and its audit together.
    fn durability(&self) -> Durability;

    /// Apply `mutation` to `target` on its own.
    ///
    /// The returned `AppliedMutation` carries the pre-state observed under
    /// the store's lock. Role changes also upsert the role assignment.
    fn apply(&self, target: &PrincipalId, mutation: &AccountMutation)
        -> CampusResult<AppliedMutation>;

    /// Apply `mutation` and run `audit` inside the same transaction.
    ///
    /// If `audit` fails the mutation must be rolled back and the audit error
    /// returned unchanged. Only meaningful when `durability()` is
    /// `Transactional`.
    fn apply_audited(
        &self,
        target: &PrincipalId,
        mutation: &AccountMutation,
        audit: &mut dyn FnMut(&AppliedMutation) -> CampusResult<()>,
    ) -> CampusResult<AppliedMutation>;
}

/// Persistence for attendance sessions and records.
pub trait AttendanceStore: Send + Sync {
    /// True if `student` belongs to the cohort described by `scope`.
    fn is_enrolled(&self, scope: &ClassScope, student: &StudentId) -> CampusResult<bool>;

    fn find_session(&self, key: &SessionKey) -> CampusResult<Option<AttendanceSession>>;

    /// Return the session for `session_ref`, creating it on first use.
    ///
    /// Creation happens at most once per (scope, date, period). A ref whose
    /// key is taken by a different course or slot is a `ValidationError`.
    fn open_session(
        &self,
        session_ref: &SessionRef,
        created_by: &PrincipalId,
    ) -> CampusResult<AttendanceSession>;

    /// Lock the session. Fails with `SessionLocked` if it already is.
    fn lock_session(
        &self,
        session: &SessionId,
        locked_by: &PrincipalId,
    ) -> CampusResult<AttendanceSession>;

    fn record(
        &self,
        session: &SessionId,
        student: &StudentId,
    ) -> CampusResult<Option<AttendanceRecord>>;

    fn records(&self, session: &SessionId) -> CampusResult<Vec<AttendanceRecord>>;

    /// Apply every write in `writes` atomically.
    ///
    /// Fails the whole batch with `ConcurrencyConflict` if the session's lock
    /// state differs from `observed_locked` or any write's expected version
    /// is stale. Returns the committed inserts and updates with their new
    /// versions, in input order.
    fn commit(
        &self,
        session: &SessionId,
        observed_locked: bool,
        writes: &[RecordWrite],
    ) -> CampusResult<Vec<AttendanceRecord>>;
}
