//! JSON request dispatch for the three inbound surfaces.
//!
//! Every raw payload is verified against its surface's schema and rules,
//! decoded into a typed request, and routed to the gateway, the attendance
//! state machine, or the ledger. Whatever happens, the caller gets an
//! `ApiResponse` envelope back; errors never escape as panics or `Err`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use campus_attendance::AttendanceStateMachine;
use campus_contracts::{
    attendance::MarkOutcome,
    audit::AuditQuery,
    error::{CampusError, CampusResult},
    request::{ApiResponse, AttendanceRequest, GatewayRequest},
};
use campus_core::{traits::AuditLedger, MutationGateway};
use campus_verify::{RequestVerifier, Surface};

pub struct Dispatcher {
    verifier: RequestVerifier,
    gateway: MutationGateway,
    attendance: AttendanceStateMachine,
    ledger: Arc<dyn AuditLedger>,
}

impl Dispatcher {
    pub fn new(
        verifier: RequestVerifier,
        gateway: MutationGateway,
        attendance: AttendanceStateMachine,
        ledger: Arc<dyn AuditLedger>,
    ) -> Self {
        Self {
            verifier,
            gateway,
            attendance,
            ledger,
        }
    }

    pub fn gateway(&self) -> &MutationGateway {
        &self.gateway
    }

    pub fn attendance(&self) -> &AttendanceStateMachine {
        &self.attendance
    }

    /// Handle one raw request on `surface`.
    pub fn dispatch(&self, surface: Surface, raw: &Value) -> ApiResponse {
        let result = match surface {
            Surface::Gateway => self.handle_gateway(raw),
            Surface::Attendance => self.handle_attendance(raw),
            Surface::AuditQuery => self.handle_audit_query(raw),
        };

        match result {
            Ok(value) => ApiResponse::ok(value),
            Err(e) => {
                warn!(%surface, error = %e, "request failed");
                ApiResponse::from(&e)
            }
        }
    }

    // ── Surfaces ─────────────────────────────────────────────────────────────

    /// Gateway success carries no result: the envelope is `{"ok": true}`.
    fn handle_gateway(&self, raw: &Value) -> CampusResult<Value> {
        let request: GatewayRequest = self.decode(Surface::Gateway, raw)?;
        debug!(actor_id = %request.actor_id(), "gateway request decoded");

        match request {
            GatewayRequest::SetStatus {
                actor_id,
                target_id,
                status,
            } => self.gateway.set_status(&actor_id, &target_id, status)?,
            GatewayRequest::SetRole {
                actor_id,
                target_id,
                role_name,
            } => self.gateway.set_primary_role(&actor_id, &target_id, role_name)?,
            GatewayRequest::DeleteUser {
                actor_id,
                target_id,
            } => self.gateway.delete_account(&actor_id, &target_id)?,
        };

        Ok(Value::Null)
    }

    fn handle_attendance(&self, raw: &Value) -> CampusResult<Value> {
        let request: AttendanceRequest = self.decode(Surface::Attendance, raw)?;
        debug!(actor_id = %request.actor_id(), "attendance request decoded");

        match request {
            AttendanceRequest::Mark {
                actor_id,
                session_ref,
                entries,
            } => {
                let mark = match entries.as_slice() {
                    [mark] => mark,
                    _ => {
                        return Err(CampusError::validation(
                            "mark takes exactly one entry; use bulk_mark for more",
                        ))
                    }
                };
                let receipt = self.attendance.mark_single(&actor_id, &session_ref, mark)?;
                let (outcome, overridden) = match &receipt.outcome {
                    MarkOutcome::Created(_) => ("created", false),
                    MarkOutcome::Edited { overridden, .. } => ("edited", *overridden),
                    MarkOutcome::Unchanged(_) => ("unchanged", false),
                };
                Ok(json!({
                    "outcome": outcome,
                    "overridden": overridden,
                    "record": to_value(receipt.outcome.record())?,
                }))
            }

            AttendanceRequest::BulkMark {
                actor_id,
                session_ref,
                entries,
            } => {
                let receipt = self.attendance.mark_bulk(&actor_id, &session_ref, &entries)?;
                to_value(&receipt.summary)
            }

            AttendanceRequest::FlagProxy {
                actor_id,
                session_ref,
                student_id,
                signal,
            } => {
                let receipt =
                    self.attendance
                        .flag_proxy(&actor_id, &session_ref, &student_id, &signal)?;
                Ok(json!({ "record": to_value(&receipt.record)? }))
            }

            AttendanceRequest::Lock {
                actor_id,
                session_ref,
            } => {
                let receipt = self.attendance.lock_session(&actor_id, &session_ref)?;
                Ok(json!({ "session": to_value(&receipt.session)? }))
            }

            AttendanceRequest::Unmark {
                actor_id,
                session_ref,
                student_id,
            } => {
                let receipt = self.attendance.unmark(&actor_id, &session_ref, &student_id)?;
                Ok(json!({ "removed": to_value(&receipt.removed)? }))
            }
        }
    }

    fn handle_audit_query(&self, raw: &Value) -> CampusResult<Value> {
        let query: AuditQuery = self.decode(Surface::AuditQuery, raw)?;
        let page = self.ledger.query(&query)?;
        to_value(&page)
    }

    // ── Decoding ─────────────────────────────────────────────────────────────

    fn decode<T: DeserializeOwned>(&self, surface: Surface, raw: &Value) -> CampusResult<T> {
        self.verifier.check(surface, raw)?;
        serde_json::from_value(raw.clone()).map_err(|e| {
            CampusError::validation(format!("malformed {surface} request: {e}"))
        })
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> CampusResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| CampusError::store(format!("failed to encode response: {e}")))
}
