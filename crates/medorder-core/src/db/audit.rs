//! Audit log database operations (append and read only).

use rusqlite::{params, params_from_iter, Row};

use super::{parse_stored, text, Database, DbError, DbResult, WhereClause};
use crate::models::{AuditAction, AuditLog, AuditLogFilter, PageRequest};

impl Database {
    /// Append an audit entry.
    pub fn insert_audit_log(&self, entry: &AuditLog) -> DbResult<()> {
        let changes = entry
            .changes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO audit_logs (
                id, user_id, action, entity_type, entity_id, changes,
                description, ip_address, user_agent, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.id,
                entry.user_id,
                entry.action.as_str(),
                entry.entity_type,
                entry.entity_id,
                changes,
                entry.description,
                entry.ip_address,
                entry.user_agent,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// List audit entries matching a filter, newest first.
    pub fn list_audit_logs(&self, filter: &AuditLogFilter, page: PageRequest) -> DbResult<(Vec<AuditLog>, u64)> {
        let mut clause = WhereClause::new();
        if let Some(user_id) = &filter.user_id {
            clause.push("user_id = ?", [text(user_id)]);
        }
        if let Some(action) = filter.action {
            clause.push("action = ?", [text(action.as_str())]);
        }
        if let Some(entity_type) = &filter.entity_type {
            clause.push("entity_type = ?", [text(entity_type)]);
        }
        if let Some(entity_id) = &filter.entity_id {
            clause.push("entity_id = ?", [text(entity_id)]);
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_logs{}", clause.sql()),
            params_from_iter(clause.args()),
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, changes,
                   description, ip_address, user_agent, created_at
            FROM audit_logs{}
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
            clause.sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.paged_args(page.limit, page.offset())), audit_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok((entries, total as u64))
    }
}

/// Intermediate row struct for database mapping.
struct AuditRow {
    id: String,
    user_id: Option<String>,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    changes: Option<String>,
    description: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: String,
}

fn audit_row(row: &Row<'_>) -> rusqlite::Result<AuditRow> {
    Ok(AuditRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        changes: row.get(5)?,
        description: row.get(6)?,
        ip_address: row.get(7)?,
        user_agent: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl TryFrom<AuditRow> for AuditLog {
    type Error = DbError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let changes = row
            .changes
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(AuditLog {
            id: row.id,
            user_id: row.user_id,
            action: parse_stored(&row.action, "audit action", AuditAction::parse)?,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            changes,
            description: row.description,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}
