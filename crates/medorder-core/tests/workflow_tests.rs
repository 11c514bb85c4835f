//! End-to-end workflow tests through the `Dashboard` facade.

use medorder_core::models::{entity, NotificationType};
use medorder_core::{
    AuditAction, AuditLogFilter, BulkAssign, Dashboard, DashboardConfig, LeadFilter, LeadStatus, LeadUpdate, NewLead,
    NewOrder, NewRole, NewUser, OrderFilter, OrderStatus, OrderUpdate, PaymentStatus, PaymentType, Permission,
    RequestContext, User, UserFilter, UserRole, UserUpdate,
};

struct Fixture {
    dashboard: Dashboard,
    admin: User,
    e: User,
    f: User,
}

impl Fixture {
    fn ctx(user: &User) -> RequestContext {
        RequestContext::for_user(&user.id).from_ip("10.0.0.1").with_user_agent("tests")
    }

    fn admin_ctx(&self) -> RequestContext {
        Self::ctx(&self.admin)
    }

    fn e_ctx(&self) -> RequestContext {
        Self::ctx(&self.e)
    }

    fn f_ctx(&self) -> RequestContext {
        Self::ctx(&self.f)
    }
}

fn test_config() -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.rate_limit.max_requests = 10_000;
    config
}

fn setup() -> Fixture {
    let dashboard = Dashboard::open_in_memory(test_config()).unwrap();
    let admin = dashboard
        .bootstrap_admin("Root", "root@example.com", "rootpass1")
        .unwrap()
        .unwrap();
    let admin_ctx = Fixture::ctx(&admin);
    let employee = |name: &str, email: &str| {
        dashboard
            .create_user(
                &admin_ctx,
                NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: "password1".to_string(),
                    role: UserRole::Employee,
                },
            )
            .unwrap()
    };
    let e = employee("Esha", "e@example.com");
    let f = employee("Farid", "f@example.com");
    Fixture { dashboard, admin, e, f }
}

fn new_lead(name: &str, phone: &str) -> NewLead {
    NewLead {
        name: name.to_string(),
        phone: phone.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_lead_to_order_scenario() {
    let fx = setup();
    let e = fx.e_ctx();

    let lead = fx.dashboard.create_lead(&e, new_lead("A", "9990001111")).unwrap();
    assert_eq!(lead.status, LeadStatus::New);
    assert_eq!(lead.assigned_to, fx.e.id);

    let detail = fx
        .dashboard
        .convert_lead(&e, NewOrder::new(&lead.id, 5000, 5000, 2000, PaymentStatus::Partial))
        .unwrap();
    assert_eq!(detail.order.received_amount, 2000);
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.booked_by, fx.e.id);
    assert_eq!(detail.order.patient_name, "A");
    assert!(detail.order.order_number.starts_with("ORD"));
    assert_eq!(detail.payments.len(), 1);
    assert_eq!(detail.payments[0].payment_type, PaymentType::Initial);
    assert_eq!(detail.payments[0].amount, 2000);
    assert_eq!(fx.dashboard.get_lead(&e, &lead.id).unwrap().status, LeadStatus::Converted);

    let updated = fx
        .dashboard
        .update_order(
            &e,
            &detail.order.id,
            OrderUpdate {
                received_amount: Some(3500),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.order.received_amount, 3500);
    assert_eq!(updated.payments.len(), 2);
    assert_eq!(updated.payments[1].payment_type, PaymentType::Partial);
    assert_eq!(updated.payments[1].amount, 1500);
    assert_eq!(updated.payments.iter().map(|p| p.amount).sum::<i64>(), 3500);

    // Exactly one order references the lead
    let orders = fx.dashboard.list_orders(&fx.admin_ctx(), OrderFilter::default()).unwrap();
    assert_eq!(orders.data.iter().filter(|o| o.lead_id == lead.id).count(), 1);

    // Converting again is a conflict
    let err = fx
        .dashboard
        .convert_lead(&e, NewOrder::new(&lead.id, 5000, 5000, 0, PaymentStatus::Pending))
        .unwrap_err();
    assert_eq!(err.status_code(), 409);

    // The employee's conversion is announced to admins
    let inbox = fx.dashboard.list_notifications(&fx.admin_ctx(), true, None).unwrap();
    assert!(inbox.iter().any(|n| n.kind == NotificationType::OrderCreated));
}

#[test]
fn test_received_amount_cannot_decrease() {
    let fx = setup();
    let e = fx.e_ctx();
    let lead = fx.dashboard.create_lead(&e, new_lead("B", "9990002222")).unwrap();
    let detail = fx
        .dashboard
        .convert_lead(&e, NewOrder::new(&lead.id, 1000, 1000, 600, PaymentStatus::Partial))
        .unwrap();

    let err = fx
        .dashboard
        .update_order(
            &e,
            &detail.order.id,
            OrderUpdate {
                received_amount: Some(100),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.validation_errors().unwrap().has_field("receivedAmount"));

    let payments = fx.dashboard.list_payments(&e, &detail.order.id).unwrap();
    assert_eq!(payments.len(), 1);

    // A payment booked by someone else tells the assignee what is still owed
    let topped_up = fx
        .dashboard
        .update_order(
            &fx.admin_ctx(),
            &detail.order.id,
            OrderUpdate {
                received_amount: Some(850),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(topped_up.payments.len(), 2);
    assert_eq!(topped_up.order.outstanding(), 150);
    let inbox = fx.dashboard.list_notifications(&e, true, None).unwrap();
    let notice = inbox
        .iter()
        .find(|n| n.kind == NotificationType::PaymentReceived)
        .unwrap();
    assert!(notice.message.ends_with(", 150 outstanding"));
}

#[test]
fn test_zero_initial_payment_creates_no_ledger_entry() {
    let fx = setup();
    let e = fx.e_ctx();
    let lead = fx.dashboard.create_lead(&e, new_lead("C", "9990003333")).unwrap();
    let detail = fx
        .dashboard
        .convert_lead(&e, NewOrder::new(&lead.id, 1000, 1000, 0, PaymentStatus::Pending))
        .unwrap();
    assert!(detail.payments.is_empty());

    let updated = fx
        .dashboard
        .update_order(
            &e,
            &detail.order.id,
            OrderUpdate {
                received_amount: Some(400),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.payments.len(), 1);
    assert_eq!(updated.payments[0].payment_type, PaymentType::Initial);
}

#[test]
fn test_bulk_assign() {
    let fx = setup();
    let admin = fx.admin_ctx();
    let ids: Vec<String> = (0..3)
        .map(|i| {
            fx.dashboard
                .create_lead(&admin, new_lead(&format!("L{}", i), &format!("999000444{}", i)))
                .unwrap()
                .id
        })
        .collect();

    let mut lead_ids = ids.clone();
    lead_ids.push("missing-lead".to_string());
    let outcome = fx
        .dashboard
        .bulk_assign_leads(
            &admin,
            BulkAssign {
                lead_ids,
                assigned_to: fx.f.id.clone(),
            },
        )
        .unwrap();
    assert_eq!(outcome.assigned, ids);
    assert_eq!(outcome.missing, vec!["missing-lead".to_string()]);

    for id in &ids {
        assert_eq!(fx.dashboard.get_lead(&fx.f_ctx(), id).unwrap().assigned_to, fx.f.id);
    }

    let filter = AuditLogFilter {
        action: Some(AuditAction::Assign),
        entity_type: Some(entity::LEAD.to_string()),
        ..Default::default()
    };
    let audit = fx.dashboard.list_audit_logs(&admin, filter).unwrap();
    assert_eq!(audit.pagination.total, 3);

    let inbox = fx.dashboard.list_notifications(&fx.f_ctx(), true, None).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationType::LeadAssigned);
}

#[test]
fn test_bulk_assign_is_admin_only() {
    let fx = setup();
    let err = fx
        .dashboard
        .bulk_assign_leads(
            &fx.e_ctx(),
            BulkAssign {
                lead_ids: vec!["x".into()],
                assigned_to: fx.e.id.clone(),
            },
        )
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[test]
fn test_employee_isolation() {
    let fx = setup();
    let e_lead = fx.dashboard.create_lead(&fx.e_ctx(), new_lead("Mine", "9990005551")).unwrap();
    let f_lead = fx.dashboard.create_lead(&fx.f_ctx(), new_lead("Theirs", "9990005552")).unwrap();
    fx.dashboard
        .convert_lead(&fx.f_ctx(), NewOrder::new(&f_lead.id, 100, 100, 0, PaymentStatus::Pending))
        .unwrap();

    let leads = fx.dashboard.list_leads(&fx.e_ctx(), LeadFilter::default()).unwrap();
    assert!(leads.data.iter().all(|l| l.assigned_to == fx.e.id));
    assert_eq!(leads.data.len(), 1);

    // Asking for someone else's rows is overridden
    let filter = OrderFilter {
        assigned_to: Some(fx.f.id.clone()),
        ..Default::default()
    };
    let orders = fx.dashboard.list_orders(&fx.e_ctx(), filter).unwrap();
    assert!(orders.data.is_empty());

    assert_eq!(fx.dashboard.get_lead(&fx.e_ctx(), &f_lead.id).unwrap_err().status_code(), 403);
    assert_eq!(
        fx.dashboard
            .update_lead(&fx.f_ctx(), &e_lead.id, LeadUpdate::with_phone("9990005551"))
            .unwrap_err()
            .status_code(),
        403
    );

    let all = fx.dashboard.list_leads(&fx.admin_ctx(), LeadFilter::default()).unwrap();
    assert_eq!(all.pagination.total, 1);
}

#[test]
fn test_converted_leads_hidden_by_default() {
    let fx = setup();
    let e = fx.e_ctx();
    let open = fx.dashboard.create_lead(&e, new_lead("Open", "9990006661")).unwrap();
    let converted = fx.dashboard.create_lead(&e, new_lead("Done", "9990006662")).unwrap();
    fx.dashboard
        .convert_lead(&e, NewOrder::new(&converted.id, 100, 100, 0, PaymentStatus::Pending))
        .unwrap();

    let default = fx.dashboard.list_leads(&e, LeadFilter::default()).unwrap();
    assert_eq!(default.data.len(), 1);
    assert_eq!(default.data[0].id, open.id);

    let filter = LeadFilter {
        status: Some(LeadStatus::Converted),
        ..Default::default()
    };
    let only_converted = fx.dashboard.list_leads(&e, filter).unwrap();
    assert_eq!(only_converted.data.len(), 1);
    assert_eq!(only_converted.data[0].id, converted.id);
}

#[test]
fn test_lead_search_and_pagination() {
    let fx = setup();
    let admin = fx.admin_ctx();
    for i in 0..5 {
        fx.dashboard
            .create_lead(&admin, new_lead(&format!("Patient {}", i), &format!("900000000{}", i)))
            .unwrap();
    }

    let filter = LeadFilter {
        limit: Some(2),
        page: Some(3),
        ..Default::default()
    };
    let page = fx.dashboard.list_leads(&admin, filter).unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 3);

    let filter = LeadFilter {
        search: Some("9000000003".into()),
        ..Default::default()
    };
    let found = fx.dashboard.list_leads(&admin, filter).unwrap();
    assert_eq!(found.data.len(), 1);
    assert_eq!(found.data[0].name, "Patient 3");
}

#[test]
fn test_status_change_notifies_assignee_and_admins() {
    let fx = setup();
    let lead = fx
        .dashboard
        .create_lead(
            &fx.admin_ctx(),
            NewLead {
                assigned_to: Some(fx.e.id.clone()),
                ..new_lead("D", "9990007771")
            },
        )
        .unwrap();
    assert_eq!(lead.assigned_to, fx.e.id);
    // Assignment by an admin is announced to the assignee
    assert_eq!(fx.dashboard.unread_notification_count(&fx.e_ctx()).unwrap(), 1);
    fx.dashboard.mark_all_notifications_read(&fx.e_ctx()).unwrap();

    let update = LeadUpdate {
        status: Some(LeadStatus::Contacted),
        ..LeadUpdate::with_phone("9990007771")
    };
    fx.dashboard.update_lead(&fx.e_ctx(), &lead.id, update).unwrap();

    // The actor is never notified about their own change
    assert_eq!(fx.dashboard.unread_notification_count(&fx.e_ctx()).unwrap(), 0);
    let inbox = fx.dashboard.list_notifications(&fx.admin_ctx(), true, None).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationType::LeadStatusChanged);
    assert_eq!(inbox[0].entity_id.as_deref(), Some(lead.id.as_str()));
}

#[test]
fn test_employee_cannot_reassign() {
    let fx = setup();
    let lead = fx.dashboard.create_lead(&fx.e_ctx(), new_lead("E1", "9990008881")).unwrap();
    let update = LeadUpdate {
        assigned_to: Some(fx.f.id.clone()),
        ..LeadUpdate::with_phone("9990008881")
    };
    let updated = fx.dashboard.update_lead(&fx.e_ctx(), &lead.id, update).unwrap();
    assert_eq!(updated.assigned_to, fx.e.id);
}

#[test]
fn test_update_cannot_mark_converted() {
    let fx = setup();
    let lead = fx.dashboard.create_lead(&fx.e_ctx(), new_lead("E2", "9990008882")).unwrap();
    let update = LeadUpdate {
        status: Some(LeadStatus::Converted),
        ..LeadUpdate::with_phone("9990008882")
    };
    let err = fx.dashboard.update_lead(&fx.e_ctx(), &lead.id, update).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_dispatch_stamps_dispatcher() {
    let fx = setup();
    let e = fx.e_ctx();
    let lead = fx.dashboard.create_lead(&e, new_lead("F1", "9990009991")).unwrap();
    let detail = fx
        .dashboard
        .convert_lead(&e, NewOrder::new(&lead.id, 1000, 1000, 1000, PaymentStatus::Full))
        .unwrap();

    let update = OrderUpdate {
        status: Some(OrderStatus::Dispatched),
        tracking_id: Some("TRK1".to_string()).into(),
        courier: Some("Speedy".to_string()).into(),
        ..Default::default()
    };
    let dispatched = fx.dashboard.update_order(&e, &detail.order.id, update).unwrap().order;
    assert_eq!(dispatched.dispatched_by.as_deref(), Some(fx.e.id.as_str()));
    assert!(dispatched.dispatch_date.is_some());
    assert_eq!(dispatched.tracking_id.as_deref(), Some("TRK1"));

    let inbox = fx.dashboard.list_notifications(&e, true, None).unwrap();
    assert!(inbox.iter().any(|n| n.kind == NotificationType::OrderDispatched));

    // A later dispatch by someone else keeps the first dispatcher
    let back = OrderUpdate {
        status: Some(OrderStatus::InTransit),
        ..Default::default()
    };
    fx.dashboard.update_order(&e, &detail.order.id, back).unwrap();
    let again = OrderUpdate {
        status: Some(OrderStatus::Dispatched),
        ..Default::default()
    };
    let order = fx
        .dashboard
        .update_order(&fx.admin_ctx(), &detail.order.id, again)
        .unwrap()
        .order;
    assert_eq!(order.dispatched_by.as_deref(), Some(fx.e.id.as_str()));

    let delivered = OrderUpdate {
        status: Some(OrderStatus::Delivered),
        ..Default::default()
    };
    let order = fx.dashboard.update_order(&e, &detail.order.id, delivered).unwrap().order;
    assert!(order.delivery_date.is_some());
}

#[test]
fn test_dispatch_range_uses_utc() {
    let fx = setup();
    let admin = fx.admin_ctx();
    let lead = fx.dashboard.create_lead(&admin, new_lead("Late", "9990009992")).unwrap();
    let detail = fx
        .dashboard
        .convert_lead(&admin, NewOrder::new(&lead.id, 1000, 1000, 0, PaymentStatus::Pending))
        .unwrap();

    // 23:00 on March 31 in UTC-5 is already April 1 in UTC
    let update = OrderUpdate {
        status: Some(OrderStatus::Dispatched),
        dispatch_date: Some("2024-03-31T23:00:00-05:00".to_string()).into(),
        ..Default::default()
    };
    let order = fx.dashboard.update_order(&admin, &detail.order.id, update).unwrap().order;
    assert_eq!(order.dispatch_date.as_deref(), Some("2024-04-01T04:00:00Z"));

    let range = |from: &str, to: &str| OrderFilter {
        dispatched_from: Some(from.to_string()),
        dispatched_to: Some(to.to_string()),
        ..Default::default()
    };
    let april = fx
        .dashboard
        .list_orders(&admin, range("2024-04-01T00:00:00+00:00", "2024-04-30T23:59:59+00:00"))
        .unwrap();
    assert_eq!(april.pagination.total, 1);
    let april_days = fx.dashboard.list_orders(&admin, range("2024-04-01", "2024-04-01")).unwrap();
    assert_eq!(april_days.pagination.total, 1);
    let march = fx.dashboard.list_orders(&admin, range("2024-03-01", "2024-03-31")).unwrap();
    assert_eq!(march.pagination.total, 0);

    let err = fx
        .dashboard
        .list_orders(&admin, range("March", "2024-04-30"))
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.validation_errors().unwrap().has_field("dispatchedFrom"));
}

#[test]
fn test_delete_rules() {
    let fx = setup();
    let e = fx.e_ctx();
    let lead = fx.dashboard.create_lead(&e, new_lead("G1", "9990001212")).unwrap();
    let detail = fx
        .dashboard
        .convert_lead(&e, NewOrder::new(&lead.id, 100, 100, 50, PaymentStatus::Partial))
        .unwrap();

    assert_eq!(fx.dashboard.delete_lead(&e, &lead.id).unwrap_err().status_code(), 409);
    assert_eq!(fx.dashboard.delete_order(&e, &detail.order.id).unwrap_err().status_code(), 403);

    fx.dashboard.delete_order(&fx.admin_ctx(), &detail.order.id).unwrap();
    assert_eq!(fx.dashboard.get_order(&e, &detail.order.id).unwrap_err().status_code(), 404);
    assert_eq!(fx.dashboard.get_lead(&e, &lead.id).unwrap().status, LeadStatus::Converted);

    let open = fx.dashboard.create_lead(&e, new_lead("G2", "9990001213")).unwrap();
    fx.dashboard.delete_lead(&e, &open.id).unwrap();
    assert_eq!(fx.dashboard.get_lead(&e, &open.id).unwrap_err().status_code(), 404);
}

#[test]
fn test_role_permissions_gate_audit_access() {
    let fx = setup();
    let e = fx.e_ctx();
    assert_eq!(fx.dashboard.list_audit_logs(&e, AuditLogFilter::default()).unwrap_err().status_code(), 403);

    let role = fx
        .dashboard
        .create_role(
            &fx.admin_ctx(),
            NewRole {
                name: "Auditor".into(),
                description: Some("Reads the audit trail".into()),
                permissions: vec![Permission::new("audit_logs", "read"), Permission::new("audit_logs", "read")],
            },
        )
        .unwrap();
    assert_eq!(role.permissions.len(), 1);
    assert!(fx.dashboard.assign_role(&fx.admin_ctx(), &fx.e.id, &role.id).unwrap());
    assert!(!fx.dashboard.assign_role(&fx.admin_ctx(), &fx.e.id, &role.id).unwrap());

    let logs = fx.dashboard.list_audit_logs(&e, AuditLogFilter::default()).unwrap();
    assert!(logs.pagination.total > 0);
    assert_eq!(fx.dashboard.user_permissions(&e, &fx.e.id).unwrap().len(), 1);
    assert_eq!(fx.dashboard.user_permissions(&e, &fx.f.id).unwrap_err().status_code(), 403);

    assert!(fx.dashboard.revoke_role(&fx.admin_ctx(), &fx.e.id, &role.id).unwrap());
    assert_eq!(fx.dashboard.list_audit_logs(&e, AuditLogFilter::default()).unwrap_err().status_code(), 403);
}

#[test]
fn test_user_management_is_admin_only() {
    let fx = setup();
    let e = fx.e_ctx();
    let role = fx
        .dashboard
        .create_role(
            &fx.admin_ctx(),
            NewRole {
                name: "User manager".into(),
                description: None,
                permissions: ["create", "read", "update", "delete"]
                    .iter()
                    .map(|action| Permission::new("users", *action))
                    .collect(),
            },
        )
        .unwrap();
    fx.dashboard.assign_role(&fx.admin_ctx(), &fx.e.id, &role.id).unwrap();

    let promote_self = UserUpdate {
        role: Some(UserRole::Admin),
        ..Default::default()
    };
    let err = fx.dashboard.update_user(&e, &fx.e.id, promote_self).unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.client_message(), "forbidden: only admins can update users");

    let new_admin = NewUser {
        name: "Sneaky".into(),
        email: "sneaky@example.com".into(),
        password: "password1".into(),
        role: UserRole::Admin,
    };
    assert_eq!(fx.dashboard.create_user(&e, new_admin).unwrap_err().status_code(), 403);
    assert_eq!(fx.dashboard.list_users(&e, UserFilter::default()).unwrap_err().status_code(), 403);
    assert_eq!(fx.dashboard.get_user(&e, &fx.f.id).unwrap_err().status_code(), 403);
    assert_eq!(fx.dashboard.delete_user(&e, &fx.f.id).unwrap_err().status_code(), 403);

    let me = fx.dashboard.get_user(&fx.admin_ctx(), &fx.e.id).unwrap();
    assert_eq!(me.role, UserRole::Employee);
    assert!(fx.dashboard.get_user(&fx.admin_ctx(), &fx.f.id).unwrap().is_active);
}

#[test]
fn test_user_lifecycle() {
    let fx = setup();
    let admin = fx.admin_ctx();

    let duplicate = NewUser {
        name: "Dup".into(),
        email: "E@Example.com".into(),
        password: "password1".into(),
        role: UserRole::Employee,
    };
    assert_eq!(fx.dashboard.create_user(&admin, duplicate).unwrap_err().status_code(), 409);

    let demote_self = UserUpdate {
        role: Some(UserRole::Employee),
        ..Default::default()
    };
    assert_eq!(
        fx.dashboard
            .update_user(&admin, &fx.admin.id, demote_self)
            .unwrap_err()
            .status_code(),
        400
    );

    let removed = fx.dashboard.delete_user(&admin, &fx.f.id).unwrap();
    assert!(!removed.is_active);
    // Deactivated users can no longer act
    assert_eq!(
        fx.dashboard
            .list_leads(&fx.f_ctx(), LeadFilter::default())
            .unwrap_err()
            .status_code(),
        401
    );
}

#[test]
fn test_authenticate() {
    let fx = setup();
    let anon = RequestContext::anonymous().from_ip("10.0.0.7");

    let user = fx.dashboard.authenticate(&anon, " E@example.com ", "password1").unwrap();
    assert_eq!(user.id, fx.e.id);
    assert_eq!(fx.dashboard.authenticate(&anon, "e@example.com", "nope").unwrap_err().status_code(), 401);
    assert_eq!(fx.dashboard.authenticate(&anon, "who@example.com", "password1").unwrap_err().status_code(), 401);

    let filter = AuditLogFilter {
        action: Some(AuditAction::Login),
        ..Default::default()
    };
    let logins = fx.dashboard.list_audit_logs(&fx.admin_ctx(), filter).unwrap();
    assert_eq!(logins.pagination.total, 1);
    assert_eq!(logins.data[0].user_id.as_deref(), Some(fx.e.id.as_str()));
    assert_eq!(logins.data[0].ip_address.as_deref(), Some("10.0.0.7"));
}

#[test]
fn test_audit_log_requires_permission() {
    let fx = setup();
    let err = fx
        .dashboard
        .list_audit_logs(&fx.e_ctx(), AuditLogFilter::default())
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.client_message(), "forbidden: insufficient permissions");
}

#[test]
fn test_notification_read_is_scoped() {
    let fx = setup();
    fx.dashboard
        .create_lead(
            &fx.admin_ctx(),
            NewLead {
                assigned_to: Some(fx.e.id.clone()),
                ..new_lead("H1", "9990001313")
            },
        )
        .unwrap();
    let inbox = fx.dashboard.list_notifications(&fx.e_ctx(), false, Some(10)).unwrap();
    assert_eq!(inbox.len(), 1);

    let err = fx.dashboard.mark_notification_read(&fx.f_ctx(), &inbox[0].id).unwrap_err();
    assert_eq!(err.status_code(), 404);

    fx.dashboard.mark_notification_read(&fx.e_ctx(), &inbox[0].id).unwrap();
    assert!(fx.dashboard.list_notifications(&fx.e_ctx(), true, None).unwrap().is_empty());
}

#[test]
fn test_writes_are_rate_limited() {
    let mut config = DashboardConfig::default();
    config.rate_limit.max_requests = 2;
    let dashboard = Dashboard::open_in_memory(config).unwrap();
    let admin = dashboard
        .bootstrap_admin("Root", "root@example.com", "rootpass1")
        .unwrap()
        .unwrap();

    let ctx = RequestContext::for_user(&admin.id).from_ip("10.9.9.9");
    dashboard.create_lead(&ctx, new_lead("R1", "9990001414")).unwrap();
    dashboard.create_lead(&ctx, new_lead("R2", "9990001415")).unwrap();
    let err = dashboard.create_lead(&ctx, new_lead("R3", "9990001416")).unwrap_err();
    assert_eq!(err.status_code(), 429);

    // Reads are not limited; other clients have their own window
    assert!(dashboard.list_leads(&ctx, LeadFilter::default()).is_ok());
    let other = RequestContext::for_user(&admin.id).from_ip("10.9.9.10");
    assert!(dashboard.create_lead(&other, new_lead("R3", "9990001416")).is_ok());
}

#[test]
fn test_validation_reports_every_field() {
    let fx = setup();
    let err = fx
        .dashboard
        .create_lead(
            &fx.e_ctx(),
            NewLead {
                email: Some("not-an-email".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert!(errors.has_field("name"));
    assert!(errors.has_field("phone"));
    assert!(errors.has_field("email"));
}
