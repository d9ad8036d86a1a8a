//! TOML-driven permission oracle.
//!
//! `TomlPermissionOracle` loads a `PolicyConfig` from a TOML string or file,
//! validates it once, and implements the `PermissionOracle` trait from
//! campus-core.
//!
//! Decision algorithm for `check(actor, permission)`:
//!
//! 1. Unknown permission name → `Deny` ("permission not found").
//! 2. Actor not `active` → `Deny`.
//! 3. Collect the scopes at which any of the actor's roles grant it.
//! 4. Any `global` grant → `GlobalAllow`.
//! 5. Any `department` grant, and the actor has a department → `DeptAllow`.
//! 6. Otherwise → `Deny`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, warn};

use campus_contracts::{
    error::{CampusError, CampusResult},
    permission::{PermissionDecision, PermissionScope},
    principal::{Principal, RoleName},
};
use campus_core::traits::PermissionOracle;

use crate::rule::{Grant, PolicyConfig};

/// A `PermissionOracle` backed by a validated TOML role catalogue.
///
/// ```rust,ignore
/// use campus_policy::TomlPermissionOracle;
///
/// let oracle = TomlPermissionOracle::from_file(Path::new("config/roles.toml"))?;
/// ```
#[derive(Debug)]
pub struct TomlPermissionOracle {
    permissions: HashSet<String>,
    roles: HashMap<RoleName, Vec<Grant>>,
}

impl TomlPermissionOracle {
    /// Parse `s` as TOML and build an oracle.
    ///
    /// Returns `CampusError::ConfigError` if the TOML is malformed, a role is
    /// declared twice, or a grant names an undeclared permission.
    pub fn from_toml_str(s: &str) -> CampusResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| CampusError::ConfigError {
            reason: format!("failed to parse role catalogue TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as a role catalogue.
    pub fn from_file(path: &Path) -> CampusResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CampusError::ConfigError {
            reason: format!("failed to read role catalogue '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Validate `config` and index it by role name.
    pub fn from_config(config: PolicyConfig) -> CampusResult<Self> {
        let permissions: HashSet<String> =
            config.permissions.into_iter().map(|p| p.name).collect();

        let mut roles = HashMap::new();
        for role in config.roles {
            if let Some(grant) = role
                .grants
                .iter()
                .find(|g| !permissions.contains(&g.permission))
            {
                return Err(CampusError::ConfigError {
                    reason: format!(
                        "role '{}' grants undeclared permission '{}'",
                        role.name, grant.permission
                    ),
                });
            }

            let name = RoleName::new(role.name);
            if roles.insert(name.clone(), role.grants).is_some() {
                return Err(CampusError::ConfigError {
                    reason: format!("role '{}' is declared more than once", name),
                });
            }
        }

        debug!(
            permissions = permissions.len(),
            roles = roles.len(),
            "role catalogue loaded"
        );

        Ok(Self { permissions, roles })
    }

    /// Every scope at which `actor`'s roles grant `permission`.
    fn scopes_for(&self, actor: &Principal, permission: &str) -> Vec<PermissionScope> {
        actor
            .roles
            .iter()
            .filter_map(|role| match self.roles.get(role) {
                Some(grants) => Some(grants),
                None => {
                    debug!(actor_id = %actor.id, role = %role, "actor holds uncatalogued role");
                    None
                }
            })
            .flatten()
            .filter(|g| g.permission == permission)
            .map(|g| g.scope)
            .collect()
    }
}

impl PermissionOracle for TomlPermissionOracle {
    fn check(&self, actor: &Principal, permission: &str) -> PermissionDecision {
        if !self.permissions.contains(permission) {
            warn!(actor_id = %actor.id, permission = %permission, "unknown permission checked");
            return PermissionDecision::Deny {
                reason: format!("permission not found: '{}'", permission),
            };
        }

        if !actor.is_active() {
            debug!(actor_id = %actor.id, status = %actor.status, "inactive actor denied");
            return PermissionDecision::Deny {
                reason: format!("actor '{}' is {}", actor.id, actor.status),
            };
        }

        let scopes = self.scopes_for(actor, permission);

        if scopes.contains(&PermissionScope::Global) {
            return PermissionDecision::GlobalAllow;
        }

        if scopes.contains(&PermissionScope::Department) {
            if let Some(department) = actor.department_id.clone() {
                return PermissionDecision::DeptAllow { department };
            }
            return PermissionDecision::Deny {
                reason: format!(
                    "'{}' is department-scoped but actor '{}' has no department",
                    permission, actor.id
                ),
            };
        }

        PermissionDecision::Deny {
            reason: format!("actor '{}' does not hold '{}'", actor.id, permission),
        }
    }

    fn role_exists(&self, role: &RoleName) -> bool {
        self.roles.contains_key(role)
    }
}
