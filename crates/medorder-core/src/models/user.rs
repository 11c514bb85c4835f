//! Users, roles and permissions.

use serde::{Deserialize, Serialize};

use super::ValidationErrors;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Base role of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Implicitly holds every permission
    Admin,
    /// Holds the union of its assigned roles' permissions
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Employee => "EMPLOYEE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(UserRole::Admin),
            "EMPLOYEE" => Some(UserRole::Employee),
            _ => None,
        }
    }
}

/// A system actor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Stored lowercase
    pub email: String,
    /// `salt$digest`, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email: email.trim().to_lowercase(),
            password_hash,
            role,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// A `(module, action)` grant, compared by exact string equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permission {
    pub module: String,
    pub action: String,
}

impl Permission {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
        }
    }

    pub fn matches(&self, module: &str, action: &str) -> bool {
        self.module == module && self.action == action
    }
}

/// A named bundle of permissions assignable to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<Permission>,
    pub created_at: String,
}

impl Role {
    pub fn new(name: String, description: Option<String>, permissions: Vec<Permission>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            permissions,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Body for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name);
        errors.check_email("email", &self.email);
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(
                "password",
                format!("password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
        errors.into_result()
    }
}

/// Body for a partial user update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.require_text("name", name);
        }
        if let Some(email) = &self.email {
            errors.check_email("email", email);
        }
        if let Some(password) = &self.password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                errors.push(
                    "password",
                    format!("password must be at least {} characters", MIN_PASSWORD_LEN),
                );
            }
        }
        errors.into_result()
    }
}

/// Body for creating a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl NewRole {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name);
        for permission in &self.permissions {
            if permission.module.trim().is_empty() || permission.action.trim().is_empty() {
                errors.push("permissions", "module and action must be non-empty");
                break;
            }
        }
        errors.into_result()
    }
}

/// Listing filters for users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    /// Matches name or email
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
