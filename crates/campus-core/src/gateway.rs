//! The authorization-scoped mutation gateway.
//!
//! Every privileged account change runs the same pipeline:
//!
//!   Target exists → Not self → Permission → Validate → Mutate + Audit
//!
//! The first failing check wins. A mutation is only reported as successful
//! once its audit entry is stored. Against a transactional store the two
//! commit together; otherwise the mutation lands first and a failed audit
//! write surfaces as `InconsistentState`.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use campus_contracts::{
    audit::{AuditLogEntry, NewAuditEntry, TargetType},
    error::{CampusError, CampusResult},
    mutation::{AccountMutation, AppliedMutation, Durability},
    permission::{Permission, PermissionDecision},
    principal::{AccountStatus, Principal, PrincipalId, RoleName},
};

use crate::traits::{AuditLedger, PermissionOracle, PrincipalStore};

/// The result of a successful gateway mutation.
#[derive(Debug, Clone)]
pub struct MutationReceipt {
    /// The stored audit entry for this mutation.
    pub entry: AuditLogEntry,
    /// The target's post-state; `None` after a deletion.
    pub principal: Option<Principal>,
}

/// The privileged front door for account-status, role, and deletion changes.
pub struct MutationGateway {
    oracle: Arc<dyn PermissionOracle>,
    ledger: Arc<dyn AuditLedger>,
    store: Arc<dyn PrincipalStore>,
}

impl MutationGateway {
    pub fn new(
        oracle: Arc<dyn PermissionOracle>,
        ledger: Arc<dyn AuditLedger>,
        store: Arc<dyn PrincipalStore>,
    ) -> Self {
        Self { oracle, ledger, store }
    }

    /// Change `target`'s account status.
    ///
    /// Requires a global `manage-status` grant, or a department-scoped one
    /// when actor and target share a department.
    pub fn set_status(
        &self,
        actor_id: &PrincipalId,
        target_id: &PrincipalId,
        status: AccountStatus,
    ) -> CampusResult<MutationReceipt> {
        let (actor, target) = self.admit(actor_id, target_id)?;

        let decision = self.oracle.check(&actor, Permission::MANAGE_STATUS);
        if !decision.authorizes(target.department_id.as_ref()) {
            return Err(self.reject(&actor, &target, Permission::MANAGE_STATUS, &decision));
        }

        self.execute(&actor, &target, AccountMutation::SetStatus(status))
    }

    /// Make `role` the target's primary role and sync its role assignment.
    ///
    /// Requires a global `create-delete-admins` grant. Repeating the call with
    /// the same role changes nothing but still appends an audit entry.
    pub fn set_primary_role(
        &self,
        actor_id: &PrincipalId,
        target_id: &PrincipalId,
        role: RoleName,
    ) -> CampusResult<MutationReceipt> {
        let (actor, target) = self.admit(actor_id, target_id)?;
        self.require_global(&actor, &target, Permission::CREATE_DELETE_ADMINS)?;

        if !self.oracle.role_exists(&role) {
            warn!(
                actor_id = %actor.id,
                target_id = %target.id,
                role = %role,
                "unknown role requested"
            );
            return Err(CampusError::validation(format!("unknown role '{role}'")));
        }

        let mutation = AccountMutation::SetPrimaryRole {
            role,
            assigned_by: actor.id.clone(),
        };
        self.execute(&actor, &target, mutation)
    }

    /// Delete `target`'s account. Requires a global `create-delete-admins` grant.
    pub fn delete_account(
        &self,
        actor_id: &PrincipalId,
        target_id: &PrincipalId,
    ) -> CampusResult<MutationReceipt> {
        let (actor, target) = self.admit(actor_id, target_id)?;
        self.require_global(&actor, &target, Permission::CREATE_DELETE_ADMINS)?;
        self.execute(&actor, &target, AccountMutation::Delete)
    }

    // ── Preconditions ────────────────────────────────────────────────────────

    /// Target lookup and the self-target check, then actor resolution.
    fn admit(
        &self,
        actor_id: &PrincipalId,
        target_id: &PrincipalId,
    ) -> CampusResult<(Principal, Principal)> {
        debug!(actor_id = %actor_id, target_id = %target_id, "gateway request admitted");

        let target = self
            .store
            .get(target_id)?
            .ok_or_else(|| CampusError::not_found(format!("principal '{target_id}'")))?;

        if actor_id == target_id {
            warn!(actor_id = %actor_id, "self-targeted privileged mutation rejected");
            return Err(CampusError::SelfTargetRejected {
                principal_id: actor_id.0.clone(),
            });
        }

        // The identity layer vouched for the id; the account may still have
        // been deleted since the session was issued.
        let actor = self.store.get(actor_id)?.ok_or_else(|| {
            CampusError::forbidden(format!("actor '{actor_id}' has no account"))
        })?;

        Ok((actor, target))
    }

    fn require_global(
        &self,
        actor: &Principal,
        target: &Principal,
        permission: &str,
    ) -> CampusResult<()> {
        let decision = self.oracle.check(actor, permission);
        if decision.is_global() {
            Ok(())
        } else {
            Err(self.reject(actor, target, permission, &decision))
        }
    }

    fn reject(
        &self,
        actor: &Principal,
        target: &Principal,
        permission: &str,
        decision: &PermissionDecision,
    ) -> CampusError {
        warn!(
            actor_id = %actor.id,
            target_id = %target.id,
            permission = %permission,
            decision = ?decision,
            "gateway permission check failed"
        );
        CampusError::forbidden(format!(
            "actor '{}' may not use '{}' on '{}'",
            actor.id, permission, target.id
        ))
    }

    // ── Execution ────────────────────────────────────────────────────────────

    fn execute(
        &self,
        actor: &Principal,
        target: &Principal,
        mutation: AccountMutation,
    ) -> CampusResult<MutationReceipt> {
        let (applied, entry) = match self.store.durability() {
            Durability::Transactional => self.execute_transactional(actor, target, &mutation)?,
            Durability::MutateThenAudit => self.execute_ordered(actor, target, &mutation)?,
        };

        info!(
            actor_id = %actor.id,
            target_id = %target.id,
            action = %entry.action_type,
            sequence = entry.sequence,
            "privileged mutation committed"
        );

        Ok(MutationReceipt {
            entry,
            principal: applied.after,
        })
    }

    /// Mutation and audit commit or roll back together.
    fn execute_transactional(
        &self,
        actor: &Principal,
        target: &Principal,
        mutation: &AccountMutation,
    ) -> CampusResult<(AppliedMutation, AuditLogEntry)> {
        let mut stored: Option<AuditLogEntry> = None;

        let applied = self.store.apply_audited(&target.id, mutation, &mut |applied| {
            let entry = self
                .ledger
                .append(audit_entry(actor, mutation, applied))
                .map_err(|e| CampusError::AuditWriteFailed {
                    reason: e.to_string(),
                })?;
            stored = Some(entry);
            Ok(())
        });

        let applied = match applied {
            Ok(applied) => applied,
            Err(e) => {
                warn!(
                    actor_id = %actor.id,
                    target_id = %target.id,
                    error = %e,
                    "transactional mutation rolled back"
                );
                return Err(e);
            }
        };

        // A store that commits without running the audit closure has broken
        // its contract; the mutation is durable with no trail.
        let entry = stored.ok_or_else(|| {
            error!(
                target_id = %target.id,
                mutation = %mutation,
                "store committed without invoking the audit write"
            );
            CampusError::InconsistentState {
                mutation: format!("{mutation} on '{}'", target.id),
                reason: "store committed without invoking the audit write".to_string(),
            }
        })?;

        Ok((applied, entry))
    }

    /// Mutate first, audit second; a lost audit write is surfaced, never dropped.
    fn execute_ordered(
        &self,
        actor: &Principal,
        target: &Principal,
        mutation: &AccountMutation,
    ) -> CampusResult<(AppliedMutation, AuditLogEntry)> {
        let applied = self.store.apply(&target.id, mutation)?;

        match self.ledger.append(audit_entry(actor, mutation, &applied)) {
            Ok(entry) => Ok((applied, entry)),
            Err(e) => {
                error!(
                    actor_id = %actor.id,
                    target_id = %target.id,
                    mutation = %mutation,
                    error = %e,
                    "mutation applied but audit write failed; manual reconciliation required"
                );
                Err(CampusError::InconsistentState {
                    mutation: format!("{mutation} on '{}'", target.id),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Build the audit entry describing `applied`.
fn audit_entry(
    actor: &Principal,
    mutation: &AccountMutation,
    applied: &AppliedMutation,
) -> NewAuditEntry {
    let before = &applied.before;
    let detail = match mutation {
        AccountMutation::SetStatus(_) => json!({
            "old_status": before.status,
            "new_status": applied.after.as_ref().map(|p| p.status),
        }),
        AccountMutation::SetPrimaryRole { role, .. } => json!({
            "old_role": before.primary_role,
            "new_role": role,
            "assignment": applied.assignment,
        }),
        AccountMutation::Delete => json!({
            "old_status": before.status,
            "old_role": before.primary_role,
            "new_value": serde_json::Value::Null,
        }),
    };

    NewAuditEntry::by(
        actor,
        mutation.action_type(),
        TargetType::Principal,
        before.id.0.clone(),
        detail,
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────
