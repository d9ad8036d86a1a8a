//! Error taxonomy for the campus accountability core.
//!
//! All fallible operations return `CampusResult<T>`. Every variant maps to
//! exactly one wire-level `ErrorKind` so transport layers can render
//! `{error: <ErrorKind>, message}` without inspecting messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The unified error type for the campus core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CampusError {
    /// The target principal, role, session, or record does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A privileged operation named the actor as its own target.
    #[error("principal '{principal_id}' may not target itself")]
    SelfTargetRejected { principal_id: String },

    /// The actor lacks the permission the operation requires.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// Malformed input: unknown role or status, bad late minutes, bad page token.
    #[error("validation error: {reason}")]
    ValidationError { reason: String },

    /// An ordinary write hit a locked attendance session.
    #[error("attendance session '{session_id}' is locked")]
    SessionLocked { session_id: String },

    /// The mutation took effect but its audit entry could not be written.
    ///
    /// Never retried automatically. The caller must escalate for manual
    /// reconciliation.
    #[error("inconsistent state: {mutation} applied but audit write failed: {reason}")]
    InconsistentState { mutation: String, reason: String },

    /// A record changed between read and write. Safe to retry.
    #[error("concurrency conflict: {reason}")]
    ConcurrencyConflict { reason: String },

    /// The audit write failed inside a transaction; the mutation was rolled back.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The backing store failed for a reason unrelated to the request.
    #[error("store error: {reason}")]
    StoreError { reason: String },
}

impl CampusError {
    /// The wire-level discriminant for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CampusError::NotFound { .. } => ErrorKind::NotFound,
            CampusError::SelfTargetRejected { .. } => ErrorKind::SelfTargetRejected,
            CampusError::Forbidden { .. } => ErrorKind::Forbidden,
            CampusError::ValidationError { .. } => ErrorKind::ValidationError,
            CampusError::SessionLocked { .. } => ErrorKind::SessionLocked,
            CampusError::InconsistentState { .. } => ErrorKind::InconsistentState,
            CampusError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            CampusError::AuditWriteFailed { .. } => ErrorKind::AuditWriteFailed,
            CampusError::ConfigError { .. } => ErrorKind::ConfigError,
            CampusError::StoreError { .. } => ErrorKind::StoreError,
        }
    }

    /// True when the caller may retry the identical request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CampusError::ConcurrencyConflict { .. })
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CampusError::NotFound { what: what.into() }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CampusError::Forbidden { reason: reason.into() }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        CampusError::ValidationError { reason: reason.into() }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        CampusError::ConcurrencyConflict { reason: reason.into() }
    }

    pub fn store(reason: impl Into<String>) -> Self {
        CampusError::StoreError { reason: reason.into() }
    }
}

/// Closed set of error discriminants rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    SelfTargetRejected,
    Forbidden,
    ValidationError,
    SessionLocked,
    InconsistentState,
    ConcurrencyConflict,
    AuditWriteFailed,
    ConfigError,
    StoreError,
}

/// Convenience alias used throughout the campus crates.
pub type CampusResult<T> = Result<T, CampusError>;
