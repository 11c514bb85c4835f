//! Lead conversion and order lifecycle operations.

use super::{ensure_admin, ensure_assignable, ensure_owner, resolve_actor, Dashboard, RequestContext};
use crate::db::{Database, DbError};
use crate::effects::{diff, AuditEntry, AuditRecorder, Notifier};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    entity, AuditAction, LeadStatus, NewOrder, NotificationDraft, NotificationType, Order, OrderDetail, OrderFilter,
    order_timestamp, OrderStatus, OrderUpdate, Page, Payment, PaymentType, User,
};

impl Dashboard {
    /// Convert a lead into an order.
    ///
    /// Number generation, the order insert, the initial payment and the lead
    /// status change commit together. Audit and notifications follow the
    /// commit.
    pub fn convert_lead(&self, ctx: &RequestContext, body: NewOrder) -> ServiceResult<OrderDetail> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        body.validate()?;

        let lead = db
            .get_lead(&body.lead_id)?
            .ok_or_else(|| ServiceError::not_found("lead", &body.lead_id))?;
        ensure_owner(&actor, &lead.assigned_to, "lead")?;
        if lead.is_converted() || db.get_order_by_lead(&lead.id)?.is_some() {
            return Err(ServiceError::Conflict("lead has already been converted to an order".into()));
        }

        let assigned_to = match body.assigned_to.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(target) if actor.is_admin() => ensure_assignable(&db, target)?.id,
            _ => actor.id.clone(),
        };

        let (order, payments) = db.with_transaction(|db| {
            let order_number = self
                .order_numbers
                .generate(&mut rand::thread_rng(), |candidate| db.order_number_exists(candidate))?;

            let mut order = Order::from_lead(&lead, order_number, actor.id.clone(), assigned_to);
            order.total_amount = body.total_amount;
            order.vpp_amount = body.vpp_amount;
            order.epp_amount = body.epp_amount;
            order.received_amount = body.received_amount;
            order.payment_status = body.payment_status;
            order.payment_method = body.payment_method.clone();
            order.payment_reference = body.payment_reference.clone();
            order.notes = body.notes.clone();
            if let Some(address) = body.address.clone().filter(|a| !a.is_empty()) {
                order.address = address;
            }
            db.insert_order(&order)?;

            let mut payments = Vec::new();
            if order.received_amount > 0 {
                let payment = Payment::new(
                    order.id.clone(),
                    order.received_amount,
                    PaymentType::Initial,
                    order.payment_method.clone(),
                    order.payment_reference.clone(),
                    actor.id.clone(),
                );
                db.insert_payment(&payment)?;
                payments.push(payment);
            }

            db.set_lead_status(&lead.id, LeadStatus::Converted)?;
            Ok::<_, DbError>((order, payments))
        })?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            lead_id = %lead.id,
            "lead converted to order"
        );

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Create, entity::ORDER, &order.id)
                .changes(diff(None::<&Order>, Some(&order)))
                .describe(format!("created order {} from lead {}", order.order_number, lead.name)),
        );

        let notifier = Notifier::new(&db);
        if order.assigned_to != actor.id {
            let draft = NotificationDraft::new(
                NotificationType::OrderAssigned,
                "New order assigned",
                format!("Order {} for {} has been assigned to you", order.order_number, order.patient_name),
            )
            .about(entity::ORDER, &order.id);
            notifier.notify(&order.assigned_to, &draft);
        }
        if !actor.is_admin() {
            let draft = NotificationDraft::new(
                NotificationType::OrderCreated,
                "New order created",
                format!(
                    "{} created order {} for {}",
                    actor.name, order.order_number, order.patient_name
                ),
            )
            .about(entity::ORDER, &order.id);
            notifier.notify_admins(&actor.id, &draft);
        }

        Ok(OrderDetail { order, payments })
    }

    pub fn get_order(&self, ctx: &RequestContext, id: &str) -> ServiceResult<OrderDetail> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        let order = load_owned_order(&db, &actor, id)?;
        let payments = db.list_payments(&order.id)?;
        Ok(OrderDetail { order, payments })
    }

    /// Page through orders, newest first. Employees see only their own.
    pub fn list_orders(&self, ctx: &RequestContext, mut filter: OrderFilter) -> ServiceResult<Page<Order>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        if !actor.is_admin() {
            filter.assigned_to = Some(actor.id.clone());
        }

        filter.normalize_dispatch_range()?;

        let page = self.page_request(filter.page, filter.limit);
        let (orders, total) = db.list_orders(&filter, page)?;
        Ok(page.into_page(orders, total))
    }

    /// Apply a partial update.
    ///
    /// A rise in `receivedAmount` appends a payment for the difference in the
    /// same transaction as the order write.
    pub fn update_order(&self, ctx: &RequestContext, id: &str, mut update: OrderUpdate) -> ServiceResult<OrderDetail> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        let mut order = load_owned_order(&db, &actor, id)?;

        if !actor.is_admin() {
            update.assigned_to = None;
        }
        update.validate(&order)?;
        if let Some(target) = update.assigned_to.as_deref().filter(|t| *t != order.assigned_to) {
            ensure_assignable(&db, target)?;
        }

        let before = order.clone();
        let method = update.payment_method.resolve(order.payment_method.clone());
        let reference = update.payment_reference.resolve(order.payment_reference.clone());
        update.apply_to(&mut order);

        let status_changed = before.status != order.status;
        let now = order_timestamp(chrono::Utc::now());
        if status_changed {
            match order.status {
                OrderStatus::Dispatched if order.dispatched_by.is_none() => {
                    order.dispatched_by = Some(actor.id.clone());
                    order.dispatch_date.get_or_insert_with(|| now.clone());
                }
                OrderStatus::Delivered => {
                    order.delivery_date.get_or_insert_with(|| now.clone());
                }
                OrderStatus::Returned => {
                    order.return_date.get_or_insert_with(|| now.clone());
                }
                _ => {}
            }
        }

        let (payment, payments) = db.with_transaction(|db| {
            db.update_order(&order)?;
            let payment = if order.received_amount > before.received_amount {
                let payment = Payment::new(
                    order.id.clone(),
                    order.received_amount - before.received_amount,
                    PaymentType::for_increase(before.received_amount),
                    method,
                    reference,
                    actor.id.clone(),
                );
                db.insert_payment(&payment)?;
                Some(payment)
            } else {
                None
            };
            let payments = db.list_payments(&order.id)?;
            Ok::<_, DbError>((payment, payments))
        })?;
        tracing::info!(order_id = %order.id, status = order.status.as_str(), "order updated");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Update, entity::ORDER, &order.id)
                .changes(diff(Some(&before), Some(&order)))
                .describe(format!("updated order {}", order.order_number)),
        );

        let notifier = Notifier::new(&db);
        let notify_assignee = order.assigned_to != actor.id;
        // Dispatch is announced to the assignee even when they made the change
        let dispatched = order.status == OrderStatus::Dispatched;
        if status_changed && (dispatched || notify_assignee) {
            let draft = match order.status {
                OrderStatus::Dispatched => NotificationDraft::new(
                    NotificationType::OrderDispatched,
                    "Order dispatched",
                    format!(
                        "Order {} has been dispatched{}",
                        order.order_number,
                        order
                            .tracking_id
                            .as_deref()
                            .map(|t| format!(" (tracking {})", t))
                            .unwrap_or_default()
                    ),
                ),
                status => NotificationDraft::new(
                    NotificationType::OrderStatusChanged,
                    "Order status changed",
                    format!("Order {} is now {}", order.order_number, status.label()),
                ),
            };
            notifier.notify(&order.assigned_to, &draft.about(entity::ORDER, &order.id));
        }
        if let Some(payment) = payment.as_ref().filter(|_| notify_assignee) {
            let draft = NotificationDraft::new(
                NotificationType::PaymentReceived,
                "Payment received",
                format!(
                    "{} received against order {}, {} outstanding",
                    payment.amount,
                    order.order_number,
                    order.outstanding()
                ),
            )
            .about(entity::ORDER, &order.id);
            notifier.notify(&order.assigned_to, &draft);
        }
        if before.assigned_to != order.assigned_to && notify_assignee {
            let draft = NotificationDraft::new(
                NotificationType::OrderAssigned,
                "Order assigned",
                format!("Order {} for {} has been assigned to you", order.order_number, order.patient_name),
            )
            .about(entity::ORDER, &order.id);
            notifier.notify(&order.assigned_to, &draft);
        }

        Ok(OrderDetail { order, payments })
    }

    /// Delete an order and its payments. The source lead stays converted.
    pub fn delete_order(&self, ctx: &RequestContext, id: &str) -> ServiceResult<()> {
        self.check_rate(ctx)?;
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        ensure_admin(&actor, "delete orders")?;

        let order = db.get_order(id)?.ok_or_else(|| ServiceError::not_found("order", id))?;
        if !db.delete_order(&order.id)? {
            return Err(ServiceError::not_found("order", id));
        }
        tracing::info!(order_id = %order.id, order_number = %order.order_number, "order deleted");

        AuditRecorder::new(&db).record(
            &ctx.actor(),
            AuditEntry::new(AuditAction::Delete, entity::ORDER, &order.id)
                .changes(diff(Some(&order), None::<&Order>))
                .describe(format!("deleted order {}", order.order_number)),
        );
        Ok(())
    }

    /// Payment history of an order, oldest first.
    pub fn list_payments(&self, ctx: &RequestContext, order_id: &str) -> ServiceResult<Vec<Payment>> {
        let db = self.lock()?;
        let actor = resolve_actor(&db, ctx)?;
        let order = load_owned_order(&db, &actor, order_id)?;
        Ok(db.list_payments(&order.id)?)
    }
}

fn load_owned_order(db: &Database, actor: &User, id: &str) -> ServiceResult<Order> {
    let order = db.get_order(id)?.ok_or_else(|| ServiceError::not_found("order", id))?;
    ensure_owner(actor, &order.assigned_to, "order")?;
    Ok(order)
}
