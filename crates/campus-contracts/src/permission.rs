//! Permission names, grant scopes, and oracle decisions.
//!
//! A permission is a named capability. Roles grant it either globally or
//! scoped to the holder's own department. The core never elevates a
//! principal's permissions; it only asks the oracle what they are.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::principal::DepartmentId;

/// A named capability string.
///
/// Names are kebab-case and descriptive: "manage-status", "mark-attendance".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission(pub String);

impl Permission {
    /// Change any principal's account status.
    pub const MANAGE_STATUS: &'static str = "manage-status";
    /// Change primary roles and delete accounts. Global grants only.
    pub const CREATE_DELETE_ADMINS: &'static str = "create-delete-admins";
    /// Mark, bulk-mark, unmark, and flag attendance records.
    pub const MARK_ATTENDANCE: &'static str = "mark-attendance";
    /// Lock an attendance session.
    pub const LOCK_ATTENDANCE: &'static str = "lock-attendance";
    /// Write to a session after it has been locked.
    pub const OVERRIDE_ATTENDANCE_LOCK: &'static str = "override-attendance-lock";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a granted permission applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    /// Applies to any target.
    Global,
    /// Applies only to targets in the holder's department.
    Department,
}

/// The answer the permission oracle gives for (actor, permission).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionDecision {
    /// The actor holds a global grant.
    GlobalAllow,
    /// The actor holds a grant scoped to `department`.
    DeptAllow { department: DepartmentId },
    /// No usable grant. `reason` is safe to surface to the caller.
    Deny { reason: String },
}

impl PermissionDecision {
    /// Apply the decision to a concrete target department.
    ///
    /// Global grants ignore the department. Department grants authorize only
    /// when the target sits in the same department; a target with no
    /// department is never covered by a scoped grant.
    pub fn authorizes(&self, target_department: Option<&DepartmentId>) -> bool {
        match self {
            PermissionDecision::GlobalAllow => true,
            PermissionDecision::DeptAllow { department } => {
                target_department.is_some_and(|t| t == department)
            }
            PermissionDecision::Deny { .. } => false,
        }
    }

    /// True only for `GlobalAllow`.
    pub fn is_global(&self) -> bool {
        matches!(self, PermissionDecision::GlobalAllow)
    }
}
