//! # campus-contracts
//!
//! Shared types, wire envelopes, and the error taxonomy for the campus
//! accountability core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, parsing, and error types.

pub mod attendance;
pub mod audit;
pub mod error;
pub mod late_pass;
pub mod mutation;
pub mod permission;
pub mod principal;
pub mod request;

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;
    use attendance::AttendanceStatus;
    use audit::{ActionType, AuditEntryId, AuditLogEntry, AuditQuery, TargetType};
    use error::{CampusError, ErrorKind};
    use permission::PermissionDecision;
    use principal::{AccountStatus, DepartmentId, Principal, PrincipalId};
    use request::{ApiResponse, GatewayRequest};

    // ── PermissionDecision ───────────────────────────────────────────────────

    #[test]
    fn global_allow_ignores_department() {
        let decision = PermissionDecision::GlobalAllow;
        assert!(decision.authorizes(None));
        assert!(decision.authorizes(Some(&DepartmentId::new("cse"))));
    }

    #[test]
    fn dept_allow_requires_matching_department() {
        let decision = PermissionDecision::DeptAllow {
            department: DepartmentId::new("cse"),
        };
        assert!(decision.authorizes(Some(&DepartmentId::new("cse"))));
        assert!(!decision.authorizes(Some(&DepartmentId::new("ece"))));

        // A target outside every department is never covered by a scoped grant.
        assert!(!decision.authorizes(None));
    }

    #[test]
    fn deny_authorizes_nothing() {
        let decision = PermissionDecision::Deny {
            reason: "permission not found".to_string(),
        };
        assert!(!decision.authorizes(None));
        assert!(!decision.authorizes(Some(&DepartmentId::new("cse"))));
    }

    // ── Parsing closed sets ──────────────────────────────────────────────────

    #[test]
    fn account_status_parses_known_values() {
        assert_eq!("active".parse::<AccountStatus>().unwrap(), AccountStatus::Active);
        assert_eq!("suspended".parse::<AccountStatus>().unwrap(), AccountStatus::Suspended);
        assert_eq!("pending".parse::<AccountStatus>().unwrap(), AccountStatus::Pending);
    }

    #[test]
    fn unknown_account_status_is_validation_error() {
        let err = "banned".parse::<AccountStatus>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("banned"));
    }

    #[test]
    fn unknown_attendance_status_is_validation_error() {
        let err = "excused".parse::<AttendanceStatus>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn action_type_serializes_snake_case() {
        assert_eq!(serde_json::to_value(ActionType::BulkMarked).unwrap(), json!("bulk_marked"));
        assert_eq!(
            serde_json::to_value(ActionType::ProxyDetected).unwrap(),
            json!("proxy_detected")
        );
        assert_eq!(ActionType::DeleteUser.as_str(), "delete_user");
    }

    // ── Principal ────────────────────────────────────────────────────────────

    #[test]
    fn role_label_falls_back_when_unassigned() {
        let mut p = Principal::new("staff-1", "teacher", Some("cse"));
        assert_eq!(p.role_label(), "teacher");

        p.primary_role = None;
        assert_eq!(p.role_label(), "unassigned");
    }

    // ── AuditQuery ───────────────────────────────────────────────────────────

    fn entry(action: ActionType, actor: &str, minutes_ago: i64) -> AuditLogEntry {
        AuditLogEntry {
            id: AuditEntryId::new(),
            sequence: 0,
            actor_id: PrincipalId::new(actor),
            actor_role: "admin".to_string(),
            action_type: action,
            target_type: TargetType::Principal,
            target_id: "target-1".to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            detail: json!({}),
        }
    }

    #[test]
    fn query_filters_combine_with_and() {
        let q = AuditQuery::page(10)
            .action(ActionType::UpdateStatus)
            .actor(PrincipalId::new("admin-1"));

        assert!(q.matches(&entry(ActionType::UpdateStatus, "admin-1", 0)));
        assert!(!q.matches(&entry(ActionType::UpdateRole, "admin-1", 0)));
        assert!(!q.matches(&entry(ActionType::UpdateStatus, "admin-2", 0)));
    }

    #[test]
    fn query_date_range_is_half_open() {
        let e = entry(ActionType::Marked, "t-1", 30);
        let q = AuditQuery::page(10).between(Some(e.created_at), Some(e.created_at));
        // from is inclusive, to is exclusive: an empty window.
        assert!(!q.matches(&e));

        let q = AuditQuery::page(10).between(Some(e.created_at), None);
        assert!(q.matches(&e));
    }

    // ── Wire envelopes ───────────────────────────────────────────────────────

    #[test]
    fn gateway_request_is_tagged_by_action() {
        let raw = json!({
            "action": "set_status",
            "actor_id": "admin-1",
            "target_id": "staff-7",
            "status": "inactive"
        });
        let req: GatewayRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(
            req,
            GatewayRequest::SetStatus {
                actor_id: PrincipalId::new("admin-1"),
                target_id: PrincipalId::new("staff-7"),
                status: AccountStatus::Inactive,
            }
        );
    }

    #[test]
    fn error_response_carries_kind_and_message() {
        let err = CampusError::SelfTargetRejected {
            principal_id: "admin-1".to_string(),
        };
        let value = serde_json::to_value(ApiResponse::from(&err)).unwrap();
        assert_eq!(value["error"], json!("SelfTargetRejected"));
        assert!(value["message"].as_str().unwrap().contains("admin-1"));
    }

    #[test]
    fn ok_response_omits_null_result() {
        let value = serde_json::to_value(ApiResponse::ok(serde_json::Value::Null)).unwrap();
        assert_eq!(value, json!({ "ok": true }));
    }

    // ── CampusError ──────────────────────────────────────────────────────────

    #[test]
    fn only_concurrency_conflicts_are_retryable() {
        assert!(CampusError::conflict("version moved").is_retryable());
        assert!(!CampusError::InconsistentState {
            mutation: "update_status".to_string(),
            reason: "ledger offline".to_string(),
        }
        .is_retryable());
        assert!(!CampusError::forbidden("nope").is_retryable());
    }

    #[test]
    fn inconsistent_state_display_names_mutation_and_cause() {
        let err = CampusError::InconsistentState {
            mutation: "delete_user staff-9".to_string(),
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("inconsistent state"));
        assert!(msg.contains("delete_user staff-9"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn session_locked_display() {
        let err = CampusError::SessionLocked {
            session_id: "s-1".to_string(),
        };
        assert!(err.to_string().contains("s-1"));
        assert_eq!(err.kind(), ErrorKind::SessionLocked);
    }
}
