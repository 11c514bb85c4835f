//! Best-effort notification fan-out.

use std::collections::HashSet;

use crate::db::{Database, DbError};
use crate::models::{Notification, NotificationDraft};

/// Creates inbox items without ever failing the caller.
pub struct Notifier<'a> {
    db: &'a Database,
}

impl<'a> Notifier<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Deliver one notification to `user_id`.
    pub fn notify(&self, user_id: &str, draft: &NotificationDraft) -> Option<Notification> {
        let notification = draft.for_user(user_id);
        match self.db.insert_notification(&notification) {
            Ok(()) => Some(notification),
            Err(e) => {
                tracing::error!(kind = draft.kind.as_str(), "failed to create notification: {:?}", e);
                None
            }
        }
    }

    /// Deliver one copy per distinct recipient, all in one transaction.
    ///
    /// Returns the created notifications, or nothing if the write failed.
    pub fn notify_many<I, S>(&self, user_ids: I, draft: &NotificationDraft) -> Vec<Notification>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let notifications: Vec<Notification> = user_ids
            .into_iter()
            .filter(|id| seen.insert(id.as_ref().to_string()))
            .map(|id| draft.for_user(id.as_ref()))
            .collect();
        if notifications.is_empty() {
            return notifications;
        }

        let result = self.db.with_transaction(|db| {
            for notification in &notifications {
                db.insert_notification(notification)?;
            }
            Ok::<_, DbError>(())
        });
        match result {
            Ok(()) => notifications,
            Err(e) => {
                tracing::error!(
                    kind = draft.kind.as_str(),
                    recipients = notifications.len(),
                    "failed to fan out notifications: {:?}",
                    e
                );
                Vec::new()
            }
        }
    }

    /// Deliver to every active admin except `actor_id`.
    pub fn notify_admins(&self, actor_id: &str, draft: &NotificationDraft) -> Vec<Notification> {
        match self.db.list_active_admin_ids() {
            Ok(ids) => self.notify_many(ids.iter().filter(|id| id.as_str() != actor_id), draft),
            Err(e) => {
                tracing::error!(kind = draft.kind.as_str(), "failed to resolve admin recipients: {:?}", e);
                Vec::new()
            }
        }
    }
}
