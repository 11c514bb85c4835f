//! Audit log models.

use serde::{Deserialize, Serialize};

/// What kind of change an audit entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Assign,
    Login,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Assign => "ASSIGN",
            AuditAction::Login => "LOGIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(AuditAction::Create),
            "UPDATE" => Some(AuditAction::Update),
            "DELETE" => Some(AuditAction::Delete),
            "ASSIGN" => Some(AuditAction::Assign),
            "LOGIN" => Some(AuditAction::Login),
            _ => None,
        }
    }
}

/// Entity type names used in audit entries and notification links.
pub mod entity {
    pub const LEAD: &str = "Lead";
    pub const ORDER: &str = "Order";
    pub const USER: &str = "User";
    pub const ROLE: &str = "Role";
}

/// An append-only record of who changed what.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    /// Acting user, if known
    pub user_id: Option<String>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// Usually `{ "before": ..., "after": ... }`
    pub changes: Option<serde_json::Value>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

/// Filters for reading the audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogFilter {
    pub user_id: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
