//! Audit trail reads.

use super::{resolve_actor, Dashboard, RequestContext};
use crate::access::{actions, modules, PermissionChecker};
use crate::error::ServiceResult;
use crate::models::{AuditLog, AuditLogFilter, Page};

impl Dashboard {
    /// Page through the audit trail, newest first.
    pub fn list_audit_logs(&self, ctx: &RequestContext, filter: AuditLogFilter) -> ServiceResult<Page<AuditLog>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        PermissionChecker::new(&db).require_permission(&actor.id, modules::AUDIT_LOGS, actions::READ)?;

        let page = self.page_request(filter.page, filter.limit);
        let (entries, total) = db.list_audit_logs(&filter, page)?;
        Ok(page.into_page(entries, total))
    }
}
