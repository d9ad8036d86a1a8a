//! In-memory implementation of `PrincipalStore`.
//!
//! Principals and role assignments live behind one `Mutex`, which doubles as
//! the transaction boundary: `apply_audited` holds the lock across the audit
//! write and restores a snapshot if that write fails. Constructed with
//! `without_transactions()` the same store reports `MutateThenAudit`, which
//! lets callers exercise the ordered, non-transactional contract.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use campus_contracts::{
    error::{CampusError, CampusResult},
    mutation::{AccountMutation, AppliedMutation, Durability},
    principal::{AssignmentChange, Principal, PrincipalId, RoleAssignment, RoleName},
};

use crate::traits::PrincipalStore;

#[derive(Debug, Clone, Default)]
struct PrincipalTable {
    principals: HashMap<PrincipalId, Principal>,
    assignments: Vec<RoleAssignment>,
}

impl PrincipalTable {
    fn apply(
        &mut self,
        target: &PrincipalId,
        mutation: &AccountMutation,
    ) -> CampusResult<AppliedMutation> {
        let before = self
            .principals
            .get(target)
            .cloned()
            .ok_or_else(|| CampusError::not_found(format!("principal '{target}'")))?;

        match mutation {
            AccountMutation::SetStatus(status) => {
                let mut after = before.clone();
                after.status = *status;
                self.principals.insert(target.clone(), after.clone());
                Ok(AppliedMutation {
                    before,
                    after: Some(after),
                    assignment: None,
                })
            }

            AccountMutation::SetPrimaryRole { role, assigned_by } => {
                let mut after = before.clone();
                if let Some(old) = before.primary_role.as_ref().filter(|old| *old != role) {
                    after.roles.remove(old);
                    self.deactivate(target, Some(old));
                }
                after.roles.insert(role.clone());
                after.primary_role = Some(role.clone());

                let change = self.upsert_assignment(target, role, assigned_by);
                self.principals.insert(target.clone(), after.clone());
                Ok(AppliedMutation {
                    before,
                    after: Some(after),
                    assignment: Some(change),
                })
            }

            AccountMutation::Delete => {
                self.principals.remove(target);
                self.deactivate(target, None);
                Ok(AppliedMutation {
                    before,
                    after: None,
                    assignment: None,
                })
            }
        }
    }

    /// Reactivate an existing (target, role) row in place, or insert one.
    fn upsert_assignment(
        &mut self,
        target: &PrincipalId,
        role: &RoleName,
        assigned_by: &PrincipalId,
    ) -> AssignmentChange {
        let existing = self
            .assignments
            .iter()
            .position(|a| a.principal_id == *target && a.role == *role);

        match existing {
            Some(idx) if self.assignments[idx].is_active => AssignmentChange::Unchanged,
            Some(idx) => {
                let row = &mut self.assignments[idx];
                row.is_active = true;
                row.assigned_by = assigned_by.clone();
                row.assigned_at = Utc::now();
                AssignmentChange::Reactivated
            }
            None => {
                self.assignments.push(RoleAssignment {
                    principal_id: target.clone(),
                    role: role.clone(),
                    is_active: true,
                    assigned_by: assigned_by.clone(),
                    assigned_at: Utc::now(),
                });
                AssignmentChange::Inserted
            }
        }
    }

    /// Deactivate `role` for `target`, or every role when `role` is `None`.
    fn deactivate(&mut self, target: &PrincipalId, role: Option<&RoleName>) {
        for row in self
            .assignments
            .iter_mut()
            .filter(|a| a.principal_id == *target && role.map_or(true, |r| a.role == *r))
        {
            row.is_active = false;
        }
    }
}

/// A `PrincipalStore` held entirely in memory.
pub struct InMemoryPrincipalStore {
    durability: Durability,
    state: Mutex<PrincipalTable>,
}

impl InMemoryPrincipalStore {
    /// A store whose `apply_audited` is a real transaction.
    pub fn new() -> Self {
        Self {
            durability: Durability::Transactional,
            state: Mutex::new(PrincipalTable::default()),
        }
    }

    /// A store that only promises single-table atomicity.
    pub fn without_transactions() -> Self {
        Self {
            durability: Durability::MutateThenAudit,
            state: Mutex::new(PrincipalTable::default()),
        }
    }

    /// Seed a principal and an active assignment for each of its roles.
    pub fn insert(&self, principal: Principal) -> CampusResult<()> {
        let mut state = self.lock()?;
        for role in &principal.roles {
            state.assignments.push(RoleAssignment {
                principal_id: principal.id.clone(),
                role: role.clone(),
                is_active: true,
                assigned_by: principal.id.clone(),
                assigned_at: Utc::now(),
            });
        }
        state.principals.insert(principal.id.clone(), principal);
        Ok(())
    }

    /// Every assignment row ever recorded for `principal`, active or not.
    pub fn assignments(&self, principal: &PrincipalId) -> CampusResult<Vec<RoleAssignment>> {
        let state = self.lock()?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.principal_id == *principal)
            .cloned()
            .collect())
    }

    fn lock(&self) -> CampusResult<MutexGuard<'_, PrincipalTable>> {
        self.state
            .lock()
            .map_err(|e| CampusError::store(format!("principal store lock poisoned: {e}")))
    }
}

impl Default for InMemoryPrincipalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PrincipalStore for InMemoryPrincipalStore {
    fn get(&self, id: &PrincipalId) -> CampusResult<Option<Principal>> {
        Ok(self.lock()?.principals.get(id).cloned())
    }

    fn durability(&self) -> Durability {
        self.durability
    }

    fn apply(
        &self,
        target: &PrincipalId,
        mutation: &AccountMutation,
    ) -> CampusResult<AppliedMutation> {
        let mut state = self.lock()?;
        state.apply(target, mutation)
    }

    /// Holds the table lock across `audit`; restores the snapshot on failure.
    fn apply_audited(
        &self,
        target: &PrincipalId,
        mutation: &AccountMutation,
        audit: &mut dyn FnMut(&AppliedMutation) -> CampusResult<()>,
    ) -> CampusResult<AppliedMutation> {
        let mut state = self.lock()?;
        let snapshot = state.clone();

        let applied = state.apply(target, mutation)?;
        if let Err(e) = audit(&applied) {
            *state = snapshot;
            debug!(target_id = %target, mutation = %mutation, "principal mutation rolled back");
            return Err(e);
        }

        Ok(applied)
    }
}
