//! Notification inbox database operations.

use rusqlite::{params, Row};

use super::{parse_stored, Database, DbError, DbResult};
use crate::models::{Notification, NotificationType};

impl Database {
    /// Insert a notification.
    pub fn insert_notification(&self, notification: &Notification) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO notifications (
                id, user_id, type, title, message, entity_type, entity_id,
                is_read, read_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                notification.id,
                notification.user_id,
                notification.kind.as_str(),
                notification.title,
                notification.message,
                notification.entity_type,
                notification.entity_id,
                notification.is_read,
                notification.read_at,
                notification.created_at,
                notification.updated_at,
            ],
        )?;
        Ok(())
    }

    /// A user's notifications, newest first.
    pub fn list_notifications(&self, user_id: &str, unread_only: bool, limit: u32) -> DbResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, type, title, message, entity_type, entity_id,
                   is_read, read_at, created_at, updated_at
            FROM notifications
            WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, unread_only, limit], notification_row)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?.try_into()?);
        }
        Ok(notifications)
    }

    /// Number of unread notifications for a user.
    pub fn count_unread_notifications(&self, user_id: &str) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Mark one notification read, scoped to its recipient.
    ///
    /// Returns false when the notification does not exist or belongs to someone else.
    pub fn mark_notification_read(&self, user_id: &str, id: &str) -> DbResult<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let rows_affected = self.conn.execute(
            r#"
            UPDATE notifications
            SET is_read = 1, read_at = COALESCE(read_at, ?3), updated_at = ?3
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![id, user_id, now],
        )?;
        Ok(rows_affected > 0)
    }

    /// Mark every unread notification of a user read. Returns how many changed.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> DbResult<u64> {
        let now = chrono::Utc::now().to_rfc3339();
        let rows_affected = self.conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = ?2, updated_at = ?2 WHERE user_id = ?1 AND is_read = 0",
            params![user_id, now],
        )?;
        Ok(rows_affected as u64)
    }
}

/// Intermediate row struct for database mapping.
struct NotificationRow {
    notification: Notification,
    kind: String,
}

fn notification_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        notification: Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: NotificationType::LeadAssigned,
            title: row.get(3)?,
            message: row.get(4)?,
            entity_type: row.get(5)?,
            entity_id: row.get(6)?,
            is_read: row.get(7)?,
            read_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        },
        kind: row.get(2)?,
    })
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DbError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let mut notification = row.notification;
        notification.kind = parse_stored(&row.kind, "notification type", NotificationType::parse)?;
        Ok(notification)
    }
}
