//! Principal identity, account status, and role assignment types.
//!
//! A `Principal` is resolved upstream by the identity service; the core only
//! reads it and mutates it through the gateway.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CampusError;

/// Stable identifier of an authenticated principal.
///
/// Example: PrincipalId("staff-0042")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an academic department.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

impl DepartmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a role bundle, e.g. "admin", "hod", "teacher".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleName(pub String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a principal's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = CampusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "suspended" => Ok(AccountStatus::Suspended),
            "pending" => Ok(AccountStatus::Pending),
            other => Err(CampusError::validation(format!(
                "unknown account status '{other}'"
            ))),
        }
    }
}

/// A resolved, authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    /// Every role currently assigned. Permission checks consult all of them.
    pub roles: BTreeSet<RoleName>,
    /// The role shown as the principal's title and recorded as `actor_role`.
    pub primary_role: Option<RoleName>,
    pub department_id: Option<DepartmentId>,
    pub status: AccountStatus,
}

impl Principal {
    /// Build an active principal holding a single role.
    pub fn new(
        id: impl Into<String>,
        role: impl Into<String>,
        department_id: Option<&str>,
    ) -> Self {
        let role = RoleName::new(role);
        let mut roles = BTreeSet::new();
        roles.insert(role.clone());
        Self {
            id: PrincipalId::new(id),
            roles,
            primary_role: Some(role),
            department_id: department_id.map(DepartmentId::new),
            status: AccountStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// The role recorded on audit entries for actions this principal takes.
    pub fn role_label(&self) -> String {
        self.primary_role
            .as_ref()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "unassigned".to_string())
    }
}

/// The secondary authorization-assignment row kept in sync with the primary role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub principal_id: PrincipalId,
    pub role: RoleName,
    pub is_active: bool,
    pub assigned_by: PrincipalId,
    pub assigned_at: DateTime<Utc>,
}

/// How an assignment upsert resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentChange {
    Inserted,
    Reactivated,
    Unchanged,
}
