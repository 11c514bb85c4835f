//! Best-effort audit trail writer.

use serde::Serialize;
use serde_json::Value;

use crate::db::{Database, DbResult};
use crate::models::{AuditAction, AuditLog};

/// Who performed a change and from where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor<'a> {
    pub user_id: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// A single change to record.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub action: AuditAction,
    pub entity_type: &'a str,
    pub entity_id: Option<&'a str>,
    pub changes: Option<Value>,
    pub description: Option<String>,
}

impl<'a> AuditEntry<'a> {
    pub fn new(action: AuditAction, entity_type: &'a str, entity_id: &'a str) -> Self {
        Self {
            action,
            entity_type,
            entity_id: Some(entity_id),
            changes: None,
            description: None,
        }
    }

    pub fn changes(mut self, changes: Value) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Build the conventional `{ before, after }` diff.
///
/// Entities that fail to serialize are recorded as `null`.
pub fn diff<B: Serialize, A: Serialize>(before: Option<&B>, after: Option<&A>) -> Value {
    let snapshot = |value: Option<Value>| value.unwrap_or(Value::Null);
    serde_json::json!({
        "before": snapshot(before.and_then(|b| serde_json::to_value(b).ok())),
        "after": snapshot(after.and_then(|a| serde_json::to_value(a).ok())),
    })
}

/// Appends audit entries without ever failing the caller.
pub struct AuditRecorder<'a> {
    db: &'a Database,
}

impl<'a> AuditRecorder<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record one entry. Storage failures are logged and swallowed.
    pub fn record(&self, actor: &Actor<'_>, entry: AuditEntry<'_>) -> Option<AuditLog> {
        let log = AuditLog {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: actor.user_id.map(str::to_string),
            action: entry.action,
            entity_type: entry.entity_type.to_string(),
            entity_id: entry.entity_id.map(str::to_string),
            changes: entry.changes,
            description: entry.description,
            ip_address: actor.ip_address.map(str::to_string),
            user_agent: actor.user_agent.map(str::to_string),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        match self.try_record(&log) {
            Ok(()) => Some(log),
            Err(e) => {
                tracing::error!(
                    action = log.action.as_str(),
                    entity_type = %log.entity_type,
                    "failed to write audit log: {:?}",
                    e
                );
                None
            }
        }
    }

    fn try_record(&self, log: &AuditLog) -> DbResult<()> {
        self.db.insert_audit_log(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditLogFilter, PageRequest};

    fn actor() -> Actor<'static> {
        Actor {
            user_id: Some("user-1"),
            ip_address: Some("10.0.0.1"),
            user_agent: Some("test-agent"),
        }
    }

    #[test]
    fn test_record_appends() {
        let db = Database::open_in_memory().unwrap();
        let recorder = AuditRecorder::new(&db);
        let entry = AuditEntry::new(AuditAction::Delete, "Lead", "lead-1")
            .changes(diff(Some(&serde_json::json!({"name": "A"})), None::<&Value>))
            .describe("lead deleted");

        let log = recorder.record(&actor(), entry).unwrap();
        assert_eq!(log.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(log.changes.as_ref().unwrap()["after"], Value::Null);

        let (entries, total) = db
            .list_audit_logs(&AuditLogFilter::default(), PageRequest { page: 1, limit: 10 })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0], log);
    }

    #[test]
    fn test_store_failure_is_swallowed() {
        let db = Database::open_in_memory().unwrap();
        db.conn().execute_batch("DROP TABLE audit_logs").unwrap();

        let recorder = AuditRecorder::new(&db);
        let entry = AuditEntry::new(AuditAction::Create, "Lead", "lead-1");
        assert!(recorder.record(&actor(), entry).is_none());
    }
}
