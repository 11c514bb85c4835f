//! Users, roles and authentication.

use rand::RngCore;
use sha2::{Digest, Sha256};

use super::{ensure_admin, resolve_actor, Dashboard, RequestContext};
use crate::access::{actions, modules, PermissionChecker};
use crate::effects::{diff, Actor, AuditEntry, AuditRecorder};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    entity, AuditAction, NewRole, NewUser, Page, Permission, Role, User, UserFilter, UserRole, UserUpdate,
    ValidationErrors,
};

const SALT_LEN: usize = 16;

/// Hash a password as `salt$digest`, both hex encoded.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    let digest = salted_digest(&salt, password);
    format!("{}${}", salt, digest)
}

/// Check a password against a stored `salt$digest`.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    match hex::decode(digest) {
        Ok(expected) => constant_time_eq(&salted_digest_bytes(salt, password), &expected),
        Err(_) => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    hex::encode(salted_digest_bytes(salt, password))
}

fn salted_digest_bytes(salt: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl Dashboard {
    /// Create the first admin when the database has no active admin yet.
    ///
    /// Returns `None` if an admin already exists.
    pub fn bootstrap_admin(&self, name: &str, email: &str, password: &str) -> ServiceResult<Option<User>> {
        let db = self.lock()?;
        if !db.list_active_admin_ids()?.is_empty() {
            return Ok(None);
        }

        let body = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: UserRole::Admin,
        };
        body.validate()?;
        if db.get_user_by_email(&body.email.trim().to_lowercase())?.is_some() {
            return Err(ServiceError::Conflict("email is already registered".into()));
        }

        let user = User::new(body.name.trim().to_string(), body.email, hash_password(&body.password), UserRole::Admin);
        db.insert_user(&user)?;
        tracing::info!(user_id = %user.id, "bootstrap admin created");

        AuditRecorder::new(&db).record(
            &Actor::default(),
            AuditEntry::new(AuditAction::Create, entity::USER, &user.id)
                .changes(diff(None::<&User>, Some(&user)))
                .describe("bootstrap admin created"),
        );
        Ok(Some(user))
    }

    /// Verify credentials and record the login.
    pub fn authenticate(&self, ctx: &RequestContext, email: &str, password: &str) -> ServiceResult<User> {
        self.check_rate(ctx)?;
        let db = self.lock()?;

        let user = match db.get_user_by_email(&email.trim().to_lowercase())? {
            Some(user) if user.is_active && verify_password(password, &user.password_hash) => user,
            _ => {
                tracing::warn!(client = ctx.client_key(), "failed login attempt");
                return Err(ServiceError::Unauthorized);
            }
        };
        tracing::info!(user_id = %user.id, "user logged in");

        let actor = Actor {
            user_id: Some(user.id.as_str()),
            ..ctx.actor()
        };
        AuditRecorder::new(&db).record(
            &actor,
            AuditEntry::new(AuditAction::Login, entity::USER, &user.id).describe(format!("{} logged in", user.email)),
        );
        Ok(user)
    }

    pub fn create_user(&self, ctx: &RequestContext, body: NewUser) -> ServiceResult<User> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        ensure_admin(&actor, "create users")?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::USERS, actions::CREATE)?;
        body.validate()?;

        let email = body.email.trim().to_lowercase();
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ServiceError::Conflict("email is already registered".into()));
        }

        let user = User::new(body.name.trim().to_string(), email, hash_password(&body.password), body.role);
        db.insert_user(&user)?;
        tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Create, entity::USER, &user.id)
                .changes(diff(None::<&User>, Some(&user)))
                .describe(format!("created user {}", user.email)),
        );
        Ok(user)
    }

    pub fn get_user(&self, ctx: &RequestContext, id: &str) -> ServiceResult<User> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        ensure_admin(&actor, "view users")?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::USERS, actions::READ)?;
        db.get_user(id)?.ok_or_else(|| ServiceError::not_found("user", id))
    }

    pub fn list_users(&self, ctx: &RequestContext, filter: UserFilter) -> ServiceResult<Page<User>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        ensure_admin(&actor, "view users")?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::USERS, actions::READ)?;

        let page = self.page_request(filter.page, filter.limit);
        let (users, total) = db.list_users(&filter, page)?;
        Ok(page.into_page(users, total))
    }

    /// Permissions a user holds through assigned roles.
    pub fn user_permissions(&self, ctx: &RequestContext, user_id: &str) -> ServiceResult<Vec<Permission>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        let checker = PermissionChecker::new(&db);
        if actor.id != user_id {
            ensure_admin(&actor, "view users")?;
            checker.require_permission(&actor.id, modules::USERS, actions::READ)?;
        }
        if db.get_user(user_id)?.is_none() {
            return Err(ServiceError::not_found("user", user_id));
        }
        Ok(checker.effective_permissions(user_id)?)
    }

    /// Apply a partial update. Admin only; admins cannot deactivate or demote themselves.
    pub fn update_user(&self, ctx: &RequestContext, id: &str, update: UserUpdate) -> ServiceResult<User> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        ensure_admin(&actor, "update users")?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::USERS, actions::UPDATE)?;
        update.validate()?;

        let mut user = db.get_user(id)?.ok_or_else(|| ServiceError::not_found("user", id))?;
        let before = user.clone();
        if user.id == actor.id {
            let mut errors = ValidationErrors::new();
            if update.is_active == Some(false) {
                errors.push("isActive", "you cannot deactivate your own account");
            }
            if actor.is_admin() && update.role == Some(UserRole::Employee) {
                errors.push("role", "you cannot remove your own admin role");
            }
            errors.into_result()?;
        }
        if let Some(email) = &update.email {
            let email = email.trim().to_lowercase();
            if matches!(db.get_user_by_email(&email)?, Some(other) if other.id != user.id) {
                return Err(ServiceError::Conflict("email is already registered".into()));
            }
            user.email = email;
        }
        if let Some(name) = update.name {
            user.name = name.trim().to_string();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        if let Some(password) = update.password {
            user.password_hash = hash_password(&password);
        }
        user.touch();
        db.update_user(&user)?;
        tracing::info!(user_id = %user.id, "user updated");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Update, entity::USER, &user.id)
                .changes(diff(Some(&before), Some(&user)))
                .describe(format!("updated user {}", user.email)),
        );
        Ok(user)
    }

    /// Deactivate a user. Leads and orders keep referencing the account.
    pub fn delete_user(&self, ctx: &RequestContext, id: &str) -> ServiceResult<User> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        ensure_admin(&actor, "delete users")?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::USERS, actions::DELETE)?;
        if actor.id == id {
            return Err(ValidationErrors::single("id", "you cannot delete your own account").into());
        }

        let mut user = db.get_user(id)?.ok_or_else(|| ServiceError::not_found("user", id))?;
        let before = user.clone();
        user.is_active = false;
        user.touch();
        db.update_user(&user)?;
        tracing::info!(user_id = %user.id, "user deactivated");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Delete, entity::USER, &user.id)
                .changes(diff(Some(&before), Some(&user)))
                .describe(format!("deactivated user {}", user.email)),
        );
        Ok(user)
    }

    pub fn create_role(&self, ctx: &RequestContext, body: NewRole) -> ServiceResult<Role> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::ROLES, actions::CREATE)?;
        body.validate()?;

        let name = body.name.trim().to_string();
        if db.get_role_by_name(&name)?.is_some() {
            return Err(ServiceError::Conflict(format!("role {} already exists", name)));
        }

        let mut permissions: Vec<Permission> = body
            .permissions
            .into_iter()
            .map(|p| Permission::new(p.module.trim(), p.action.trim()))
            .collect();
        permissions.sort();
        permissions.dedup();

        let role = Role::new(name, body.description, permissions);
        db.insert_role(&role)?;
        tracing::info!(role_id = %role.id, name = %role.name, "role created");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Create, entity::ROLE, &role.id)
                .changes(diff(None::<&Role>, Some(&role)))
                .describe(format!("created role {}", role.name)),
        );
        Ok(role)
    }

    pub fn list_roles(&self, ctx: &RequestContext) -> ServiceResult<Vec<Role>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::ROLES, actions::READ)?;
        Ok(db.list_roles()?)
    }

    /// Grant a role to a user. Returns false if it was already held.
    pub fn assign_role(&self, ctx: &RequestContext, user_id: &str, role_id: &str) -> ServiceResult<bool> {
        self.change_role(ctx, user_id, role_id, true)
    }

    /// Take a role away from a user. Returns false if it was not held.
    pub fn revoke_role(&self, ctx: &RequestContext, user_id: &str, role_id: &str) -> ServiceResult<bool> {
        self.change_role(ctx, user_id, role_id, false)
    }

    fn change_role(&self, ctx: &RequestContext, user_id: &str, role_id: &str, grant: bool) -> ServiceResult<bool> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::ROLES, actions::ASSIGN)?;

        let user = db.get_user(user_id)?.ok_or_else(|| ServiceError::not_found("user", user_id))?;
        let role = db.get_role(role_id)?.ok_or_else(|| ServiceError::not_found("role", role_id))?;

        let changed = if grant {
            db.assign_role(&user.id, &role.id)?
        } else {
            db.revoke_role(&user.id, &role.id)?
        };
        if !changed {
            return Ok(false);
        }
        tracing::info!(user_id = %user.id, role = %role.name, grant, "role assignment changed");

        let (action, description) = if grant {
            (AuditAction::Assign, format!("granted role {} to {}", role.name, user.email))
        } else {
            (AuditAction::Delete, format!("revoked role {} from {}", role.name, user.email))
        };
        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(action, entity::USER, &user.id)
                .changes(serde_json::json!({ "roleId": role.id, "granted": grant }))
                .describe(description),
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MIN_PASSWORD_LEN;

    #[test]
    fn test_password_round_trip() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
        assert!(!verify_password("correct horse", "garbage"));
    }

    #[test]
    fn test_verify_rejects_tampered_digest() {
        let stored = hash_password("correct horse");
        let (salt, digest) = stored.split_once('$').unwrap();
        let mut flipped = hex::decode(digest).unwrap();
        flipped[31] ^= 1;
        assert!(!verify_password("correct horse", &format!("{}${}", salt, hex::encode(&flipped))));
        assert!(!verify_password("correct horse", &format!("{}${}", salt, &digest[..62])));
        assert!(!verify_password("correct horse", &format!("{}$not-hex", salt)));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn test_hash_is_salted() {
        assert_ne!(hash_password("same password"), hash_password("same password"));
    }

    #[test]
    fn test_min_password_len_matches_validation() {
        let body = NewUser {
            name: "A".into(),
            email: "a@example.com".into(),
            password: "x".repeat(MIN_PASSWORD_LEN),
            role: UserRole::Employee,
        };
        assert!(body.validate().is_ok());
    }
}
