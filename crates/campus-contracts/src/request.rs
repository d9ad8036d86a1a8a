//! Wire envelopes for the gateway, attendance, and audit surfaces.
//!
//! Requests are tagged by `action`. Responses are either
//! `{"ok": true, "result": ...}` or `{"error": <ErrorKind>, "message": ...}`.

use serde::{Deserialize, Serialize};

use crate::{
    attendance::{MarkEntry, ProxySignal, SessionRef, StudentId},
    error::{CampusError, ErrorKind},
    principal::{AccountStatus, PrincipalId, RoleName},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GatewayRequest {
    SetStatus {
        actor_id: PrincipalId,
        target_id: PrincipalId,
        status: AccountStatus,
    },
    SetRole {
        actor_id: PrincipalId,
        target_id: PrincipalId,
        role_name: RoleName,
    },
    DeleteUser {
        actor_id: PrincipalId,
        target_id: PrincipalId,
    },
}

impl GatewayRequest {
    pub fn actor_id(&self) -> &PrincipalId {
        match self {
            GatewayRequest::SetStatus { actor_id, .. }
            | GatewayRequest::SetRole { actor_id, .. }
            | GatewayRequest::DeleteUser { actor_id, .. } => actor_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AttendanceRequest {
    /// Exactly one entry.
    Mark {
        actor_id: PrincipalId,
        session_ref: SessionRef,
        entries: Vec<MarkEntry>,
    },
    BulkMark {
        actor_id: PrincipalId,
        session_ref: SessionRef,
        entries: Vec<MarkEntry>,
    },
    FlagProxy {
        actor_id: PrincipalId,
        session_ref: SessionRef,
        student_id: StudentId,
        signal: ProxySignal,
    },
    Lock {
        actor_id: PrincipalId,
        session_ref: SessionRef,
    },
    Unmark {
        actor_id: PrincipalId,
        session_ref: SessionRef,
        student_id: StudentId,
    },
}

impl AttendanceRequest {
    pub fn actor_id(&self) -> &PrincipalId {
        match self {
            AttendanceRequest::Mark { actor_id, .. }
            | AttendanceRequest::BulkMark { actor_id, .. }
            | AttendanceRequest::FlagProxy { actor_id, .. }
            | AttendanceRequest::Lock { actor_id, .. }
            | AttendanceRequest::Unmark { actor_id, .. } => actor_id,
        }
    }
}

/// The response envelope shared by every surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Ok {
        ok: bool,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        result: serde_json::Value,
    },
    Error {
        error: ErrorKind,
        message: String,
    },
}

impl ApiResponse {
    pub fn ok(result: serde_json::Value) -> Self {
        ApiResponse::Ok { ok: true, result }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResponse::Ok { ok: true, .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ApiResponse::Ok { .. } => None,
            ApiResponse::Error { error, .. } => Some(*error),
        }
    }
}

impl From<&CampusError> for ApiResponse {
    fn from(err: &CampusError) -> Self {
        ApiResponse::Error {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<CampusError> for ApiResponse {
    fn from(err: CampusError) -> Self {
        ApiResponse::from(&err)
    }
}
