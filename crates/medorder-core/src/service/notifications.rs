//! The acting user's notification inbox.

use super::{resolve_actor, Dashboard, RequestContext};
use crate::error::{ServiceError, ServiceResult};
use crate::models::Notification;

impl Dashboard {
    /// Newest notifications for the caller, capped at the configured limit.
    pub fn list_notifications(
        &self,
        ctx: &RequestContext,
        unread_only: bool,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Notification>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        let cap = self.config.notification_limit;
        let limit = limit.filter(|l| *l > 0).unwrap_or(cap).min(cap);
        Ok(db.list_notifications(&actor.id, unread_only, limit)?)
    }

    pub fn unread_notification_count(&self, ctx: &RequestContext) -> ServiceResult<u64> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        Ok(db.count_unread_notifications(&actor.id)?)
    }

    /// Mark one of the caller's notifications read.
    ///
    /// Someone else's notification is reported as not found.
    pub fn mark_notification_read(&self, ctx: &RequestContext, id: &str) -> ServiceResult<()> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        if db.mark_notification_read(&actor.id, id)? {
            Ok(())
        } else {
            Err(ServiceError::not_found("notification", id))
        }
    }

    /// Mark everything in the caller's inbox read. Returns how many changed.
    pub fn mark_all_notifications_read(&self, ctx: &RequestContext) -> ServiceResult<u64> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        Ok(db.mark_all_notifications_read(&actor.id)?)
    }
}
