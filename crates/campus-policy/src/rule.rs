//! Role catalogue types and configuration schema.
//!
//! A `PolicyConfig` is deserialized from TOML and declares two things: the
//! permission names the deployment knows about, and the roles that bundle
//! them. Each grant inside a role carries a scope, `global` or `department`.

use serde::{Deserialize, Serialize};

use campus_contracts::permission::PermissionScope;

/// A permission the catalogue declares.
///
/// Grants may only name declared permissions; anything else is rejected when
/// the catalogue is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDef {
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// One permission granted by a role, at a given scope.
///
/// Example in TOML:
/// ```toml
/// grants = [
///     { permission = "manage-status", scope = "department" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub permission: String,
    pub scope: PermissionScope,
}

/// A named bundle of grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDef {
    /// The role name principals are assigned, e.g. `"hod"`.
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub grants: Vec<Grant>,
}

/// The top-level structure deserialized from a TOML role catalogue.
///
/// Example:
/// ```toml
/// [[permissions]]
/// name = "manage-status"
///
/// [[roles]]
/// name = "admin"
/// grants = [{ permission = "manage-status", scope = "global" }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub permissions: Vec<PermissionDef>,

    #[serde(default)]
    pub roles: Vec<RoleDef>,
}
