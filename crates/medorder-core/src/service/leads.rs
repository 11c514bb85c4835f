//! Lead lifecycle operations.

use std::collections::HashSet;

use super::{ensure_admin, ensure_assignable, ensure_owner, resolve_actor, Dashboard, RequestContext};
use crate::db::{Database, DbError};
use crate::effects::{diff, AuditEntry, AuditRecorder, Notifier};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    entity, AuditAction, BulkAssign, BulkAssignOutcome, Lead, LeadFilter, LeadStatus, LeadUpdate, NewLead,
    NotificationDraft, NotificationType, Page, User, ValidationErrors,
};

impl Dashboard {
    /// Capture a new lead.
    ///
    /// Employees always own what they create; admins may hand it to any
    /// active user.
    pub fn create_lead(&self, ctx: &RequestContext, body: NewLead) -> ServiceResult<Lead> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        body.validate()?;

        let assigned_to = match body.assigned_to.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(target) if actor.is_admin() => ensure_assignable(&db, target)?.id,
            _ => actor.id.clone(),
        };

        let lead = body.into_lead(actor.id.clone(), assigned_to);
        db.insert_lead(&lead)?;
        tracing::info!(lead_id = %lead.id, assigned_to = %lead.assigned_to, "lead created");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Create, entity::LEAD, &lead.id)
                .changes(diff(None::<&Lead>, Some(&lead)))
                .describe(format!("created lead {}", lead.name)),
        );
        if lead.assigned_to != actor.id {
            Notifier::new(&db).notify(&lead.assigned_to, &assigned_draft(&lead));
        }

        Ok(lead)
    }

    pub fn get_lead(&self, ctx: &RequestContext, id: &str) -> ServiceResult<Lead> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        load_owned_lead(&db, &actor, id)
    }

    /// Page through leads, newest first.
    ///
    /// Employees only ever see their own leads. Converted leads appear only
    /// when asked for by status.
    pub fn list_leads(&self, ctx: &RequestContext, mut filter: LeadFilter) -> ServiceResult<Page<Lead>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        if !actor.is_admin() {
            filter.assigned_to = Some(actor.id.clone());
        }

        let page = self.page_request(filter.page, filter.limit);
        let (leads, total) = db.list_leads(&filter, page)?;
        Ok(page.into_page(leads, total))
    }

    /// Apply a partial update.
    pub fn update_lead(&self, ctx: &RequestContext, id: &str, mut update: LeadUpdate) -> ServiceResult<Lead> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        let mut lead = load_owned_lead(&db, &actor, id)?;

        if !actor.is_admin() {
            update.assigned_to = None;
        }
        update.validate()?;
        if update.status == Some(LeadStatus::Converted) && !lead.is_converted() {
            return Err(ValidationErrors::single("status", "a lead is only converted by creating an order").into());
        }
        if let Some(target) = update.assigned_to.as_deref().filter(|t| *t != lead.assigned_to) {
            ensure_assignable(&db, target)?;
        }

        let before = lead.clone();
        update.apply_to(&mut lead);
        db.update_lead(&lead)?;
        tracing::info!(lead_id = %lead.id, status = lead.status.as_str(), "lead updated");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Update, entity::LEAD, &lead.id)
                .changes(diff(Some(&before), Some(&lead)))
                .describe(format!("updated lead {}", lead.name)),
        );

        let notifier = Notifier::new(&db);
        if before.status != lead.status {
            let draft = NotificationDraft::new(
                NotificationType::LeadStatusChanged,
                "Lead status changed",
                format!(
                    "{} moved from {} to {}",
                    lead.name,
                    before.status.as_str(),
                    lead.status.as_str()
                ),
            )
            .about(entity::LEAD, &lead.id);
            if lead.assigned_to != actor.id {
                notifier.notify(&lead.assigned_to, &draft);
            }
            if !actor.is_admin() {
                notifier.notify_admins(&actor.id, &draft);
            }
        }
        if before.assigned_to != lead.assigned_to && lead.assigned_to != actor.id {
            notifier.notify(&lead.assigned_to, &assigned_draft(&lead));
        }

        Ok(lead)
    }

    /// Delete a lead that has not been converted.
    pub fn delete_lead(&self, ctx: &RequestContext, id: &str) -> ServiceResult<()> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        let lead = load_owned_lead(&db, &actor, id)?;

        if lead.is_converted() || db.get_order_by_lead(&lead.id)?.is_some() {
            return Err(ServiceError::Conflict("lead has already been converted to an order".into()));
        }
        if !db.delete_lead(&lead.id)? {
            return Err(ServiceError::not_found("lead", id));
        }
        tracing::info!(lead_id = %lead.id, "lead deleted");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Delete, entity::LEAD, &lead.id)
                .changes(diff(Some(&lead), None::<&Lead>))
                .describe(format!("deleted lead {}", lead.name)),
        );
        Ok(())
    }

    /// Reassign many leads to one user in a single transaction.
    ///
    /// Unknown IDs are reported in the outcome rather than failing the batch.
    pub fn bulk_assign_leads(&self, ctx: &RequestContext, body: BulkAssign) -> ServiceResult<BulkAssignOutcome> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        ensure_admin(&actor, "bulk assign leads")?;

        if body.lead_ids.is_empty() {
            return Err(ValidationErrors::single("leadIds", "at least one lead id is required").into());
        }
        let target = ensure_assignable(&db, &body.assigned_to)?;

        let mut seen = HashSet::new();
        let lead_ids: Vec<&String> = body.lead_ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let (reassigned, missing) = db.with_transaction(|db| {
            let mut reassigned: Vec<(String, String)> = Vec::new();
            let mut missing = Vec::new();
            for id in &lead_ids {
                match db.get_lead(id)? {
                    Some(mut lead) => {
                        let previous = std::mem::replace(&mut lead.assigned_to, target.id.clone());
                        lead.touch();
                        db.update_lead(&lead)?;
                        reassigned.push((lead.id, previous));
                    }
                    None => missing.push(id.to_string()),
                }
            }
            Ok::<_, DbError>((reassigned, missing))
        })?;
        tracing::info!(
            assigned = reassigned.len(),
            missing = missing.len(),
            target = %target.id,
            "leads bulk assigned"
        );

        let recorder = AuditRecorder::new(&db);
        for (lead_id, previous) in &reassigned {
            recorder.record(
                &ctx.actor(),
                AuditEntry::new(AuditAction::Assign, entity::LEAD, lead_id)
                    .changes(serde_json::json!({
                        "before": { "assignedTo": previous },
                        "after": { "assignedTo": target.id },
                    }))
                    .describe(format!("assigned lead to {}", target.name)),
            );
        }
        if !reassigned.is_empty() && target.id != actor.id {
            let draft = NotificationDraft::new(
                NotificationType::LeadAssigned,
                "Leads assigned",
                format!("{} leads have been assigned to you", reassigned.len()),
            );
            Notifier::new(&db).notify(&target.id, &draft);
        }

        Ok(BulkAssignOutcome {
            assigned: reassigned.into_iter().map(|(id, _)| id).collect(),
            missing,
        })
    }
}

fn load_owned_lead(db: &Database, actor: &User, id: &str) -> ServiceResult<Lead> {
    let lead = db.get_lead(id)?.ok_or_else(|| ServiceError::not_found("lead", id))?;
    ensure_owner(actor, &lead.assigned_to, "lead")?;
    Ok(lead)
}

fn assigned_draft(lead: &Lead) -> NotificationDraft {
    NotificationDraft::new(
        NotificationType::LeadAssigned,
        "New lead assigned",
        format!("{} ({}) has been assigned to you", lead.name, lead.phone),
    )
    .about(entity::LEAD, &lead.id)
}
