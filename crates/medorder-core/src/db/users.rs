//! User, role and permission database operations.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{like_pattern, parse_stored, text, Database, DbError, DbResult, WhereClause};
use crate::models::{PageRequest, Permission, Role, User, UserFilter, UserRole};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, is_active, created_at, updated_at";

impl Database {
    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.is_active,
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing user.
    pub fn update_user(&self, user: &User) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE users SET
                name = ?2,
                email = ?3,
                password_hash = ?4,
                role = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.is_active,
                user.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [id],
                user_row,
            )
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    /// Get a user by email (case-insensitive).
    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                [email.trim().to_lowercase()],
                user_row,
            )
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    /// List users matching a filter, newest first. Returns the page and the total count.
    pub fn list_users(&self, filter: &UserFilter, page: PageRequest) -> DbResult<(Vec<User>, u64)> {
        let mut clause = WhereClause::new();
        if let Some(role) = filter.role {
            clause.push("role = ?", [text(role.as_str())]);
        }
        if let Some(active) = filter.is_active {
            clause.push("is_active = ?", [rusqlite::types::Value::Integer(active as i64)]);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clause.push(
                "(name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\')",
                [like_pattern(search), like_pattern(search)],
            );
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM users{}", clause.sql()),
            params_from_iter(clause.args()),
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM users{} ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
            USER_COLUMNS,
            clause.sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.paged_args(page.limit, page.offset())), user_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?.try_into()?);
        }
        Ok((users, total as u64))
    }

    /// IDs of every active admin.
    pub fn list_active_admin_ids(&self) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM users WHERE role = 'ADMIN' AND is_active = 1 ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Insert a role together with its permission grants.
    pub fn insert_role(&self, role: &Role) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO roles (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![role.id, role.name, role.description, role.created_at],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO role_permissions (role_id, module, action) VALUES (?1, ?2, ?3)",
        )?;
        for permission in &role.permissions {
            stmt.execute(params![role.id, permission.module, permission.action])?;
        }
        Ok(())
    }

    /// Get a role by ID, with its permissions.
    pub fn get_role(&self, id: &str) -> DbResult<Option<Role>> {
        let role = self
            .conn
            .query_row(
                "SELECT id, name, description, created_at FROM roles WHERE id = ?",
                [id],
                role_row,
            )
            .optional()?;
        match role {
            Some(mut role) => {
                role.permissions = self.role_permissions(&role.id)?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }

    /// Get a role by its unique name.
    pub fn get_role_by_name(&self, name: &str) -> DbResult<Option<Role>> {
        let id: Option<String> = self
            .conn
            .query_row("SELECT id FROM roles WHERE name = ?", [name], |row| row.get(0))
            .optional()?;
        match id {
            Some(id) => self.get_role(&id),
            None => Ok(None),
        }
    }

    /// List all roles with permissions, by name.
    pub fn list_roles(&self) -> DbResult<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, created_at FROM roles ORDER BY name")?;
        let rows = stmt.query_map([], role_row)?;

        let mut roles = Vec::new();
        for row in rows {
            let mut role = row?;
            role.permissions = self.role_permissions(&role.id)?;
            roles.push(role);
        }
        Ok(roles)
    }

    /// Roles assigned to a user, with permissions.
    pub fn roles_for_user(&self, user_id: &str) -> DbResult<Vec<Role>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT r.id, r.name, r.description, r.created_at
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            ORDER BY r.name
            "#,
        )?;
        let rows = stmt.query_map([user_id], role_row)?;

        let mut roles = Vec::new();
        for row in rows {
            let mut role = row?;
            role.permissions = self.role_permissions(&role.id)?;
            roles.push(role);
        }
        Ok(roles)
    }

    /// Assign a role to a user. Returns false if it was already assigned.
    pub fn assign_role(&self, user_id: &str, role_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            [user_id, role_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Remove a role from a user.
    pub fn revoke_role(&self, user_id: &str, role_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
            [user_id, role_id],
        )?;
        Ok(rows_affected > 0)
    }

    fn role_permissions(&self, role_id: &str) -> DbResult<Vec<Permission>> {
        let mut stmt = self.conn.prepare(
            "SELECT module, action FROM role_permissions WHERE role_id = ? ORDER BY module, action",
        )?;
        let rows = stmt.query_map([role_id], |row| {
            Ok(Permission {
                module: row.get(0)?,
                action: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Intermediate row struct for database mapping.
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: parse_stored(&row.role, "user role", UserRole::parse)?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn role_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        permissions: Vec::new(),
        created_at: row.get(3)?,
    })
}
