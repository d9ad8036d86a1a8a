//! Account mutations applied by principal stores on behalf of the gateway.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    audit::ActionType,
    principal::{AccountStatus, AssignmentChange, Principal, PrincipalId, RoleName},
};

/// A privileged change to one principal's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountMutation {
    SetStatus(AccountStatus),
    SetPrimaryRole {
        role: RoleName,
        assigned_by: PrincipalId,
    },
    /// Remove the principal entirely; it can no longer authenticate.
    Delete,
}

impl AccountMutation {
    /// The audit action this mutation is recorded under.
    pub fn action_type(&self) -> ActionType {
        match self {
            AccountMutation::SetStatus(_) => ActionType::UpdateStatus,
            AccountMutation::SetPrimaryRole { .. } => ActionType::UpdateRole,
            AccountMutation::Delete => ActionType::DeleteUser,
        }
    }
}

impl fmt::Display for AccountMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountMutation::SetStatus(status) => write!(f, "update_status -> {status}"),
            AccountMutation::SetPrimaryRole { role, .. } => write!(f, "update_role -> {role}"),
            AccountMutation::Delete => f.write_str("delete_user"),
        }
    }
}

/// The pre- and post-state a store observed while applying a mutation.
///
/// Captured under the store's own lock or transaction so the audit entry's
/// old values can never come from a stale read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMutation {
    pub before: Principal,
    /// `None` after a deletion.
    pub after: Option<Principal>,
    /// Set for role changes only.
    pub assignment: Option<AssignmentChange>,
}

/// What a principal store can promise about mutation + audit durability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// The mutation and the audit write commit or roll back together.
    Transactional,
    /// Only single-table atomicity: mutate first, audit second.
    MutateThenAudit,
}
