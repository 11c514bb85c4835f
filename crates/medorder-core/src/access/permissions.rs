//! Module/action permission checks.

use std::collections::BTreeSet;

use crate::db::{Database, DbResult};
use crate::error::{ServiceError, ServiceResult};
use crate::models::Permission;

/// Module names used by gated operations.
pub mod modules {
    pub const USERS: &str = "users";
    pub const ROLES: &str = "roles";
    pub const AUDIT_LOGS: &str = "audit_logs";
}

/// Action names used by gated operations.
pub mod actions {
    pub const CREATE: &str = "create";
    pub const READ: &str = "read";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const ASSIGN: &str = "assign";
}

/// Resolves a user's permissions from storage on every call.
pub struct PermissionChecker<'a> {
    db: &'a Database,
}

impl<'a> PermissionChecker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Whether `user_id` may perform `action` on `module`.
    ///
    /// Admins hold every permission. Unknown and inactive users hold none.
    pub fn has_permission(&self, user_id: &str, module: &str, action: &str) -> DbResult<bool> {
        let Some(user) = self.db.get_user(user_id)? else {
            return Ok(false);
        };
        if !user.is_active {
            return Ok(false);
        }
        if user.is_admin() {
            return Ok(true);
        }

        let roles = self.db.roles_for_user(user_id)?;
        Ok(roles
            .iter()
            .flat_map(|role| role.permissions.iter())
            .any(|permission| permission.matches(module, action)))
    }

    /// Fail with `Forbidden` unless the user holds the permission.
    pub fn require_permission(&self, user_id: &str, module: &str, action: &str) -> ServiceResult<()> {
        if self.has_permission(user_id, module, action)? {
            Ok(())
        } else {
            tracing::warn!(user_id, module, action, "permission denied");
            Err(ServiceError::forbidden("insufficient permissions"))
        }
    }

    /// Deduplicated union of the permissions granted by a user's roles.
    ///
    /// Admins are reported with their assigned roles only; their implicit
    /// grant is not enumerated.
    pub fn effective_permissions(&self, user_id: &str) -> DbResult<Vec<Permission>> {
        let permissions: BTreeSet<Permission> = self
            .db
            .roles_for_user(user_id)?
            .into_iter()
            .flat_map(|role| role.permissions)
            .collect();
        Ok(permissions.into_iter().collect())
    }
}
