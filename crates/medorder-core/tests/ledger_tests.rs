//! Payment ledger and durability tests against file-backed databases.

use medorder_core::{
    AuditLogFilter, Dashboard, DashboardConfig, Database, LeadStatus, NewLead, NewOrder, OrderStatus, OrderUpdate, PaymentStatus,
    RequestContext,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn config_at(dir: &TempDir) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.database_path = dir.path().join("medorder.db");
    config.rate_limit.max_requests = 10_000;
    config
}

fn admin_context(dashboard: &Dashboard) -> RequestContext {
    let admin = dashboard
        .bootstrap_admin("Root", "root@example.com", "rootpass1")
        .unwrap()
        .unwrap();
    RequestContext::for_user(admin.id).from_ip("127.0.0.1")
}

fn lead(name: &str) -> NewLead {
    NewLead {
        name: name.to_string(),
        phone: "9990001111".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_at(&dir);

    let (lead_id, order_id) = {
        let dashboard = Dashboard::open(config.clone()).unwrap();
        let ctx = admin_context(&dashboard);
        let lead = dashboard.create_lead(&ctx, lead("Persisted")).unwrap();
        let detail = dashboard
            .convert_lead(&ctx, NewOrder::new(&lead.id, 900, 900, 300, PaymentStatus::Partial))
            .unwrap();
        (lead.id, detail.order.id)
    };

    let db = Database::open(&config.database_path).unwrap();
    assert_eq!(db.get_lead(&lead_id).unwrap().unwrap().status, LeadStatus::Converted);
    assert_eq!(db.get_order_by_lead(&lead_id).unwrap().unwrap().id, order_id);
    let ledger = db.list_payments(&order_id).unwrap();
    assert_eq!(ledger.iter().map(|p| p.amount).sum::<i64>(), 300);

    // A second bootstrap is a no-op
    let dashboard = Dashboard::new(db, config);
    assert!(dashboard
        .bootstrap_admin("Other", "other@example.com", "password1")
        .unwrap()
        .is_none());
}

#[test]
fn test_audit_failure_does_not_fail_mutation() {
    let dir = TempDir::new().unwrap();
    let config = config_at(&dir);
    let dashboard = Dashboard::open(config.clone()).unwrap();
    let ctx = admin_context(&dashboard);

    // Break the audit store behind the dashboard's back
    let side = rusqlite::Connection::open(&config.database_path).unwrap();
    side.execute_batch("DROP TABLE audit_logs").unwrap();
    drop(side);

    let created = dashboard.create_lead(&ctx, lead("Unaudited")).unwrap();
    let detail = dashboard
        .convert_lead(&ctx, NewOrder::new(&created.id, 500, 500, 500, PaymentStatus::Full))
        .unwrap();
    assert_eq!(detail.payments.len(), 1);
    assert_eq!(dashboard.get_lead(&ctx, &created.id).unwrap().status, LeadStatus::Converted);

    // Reading the broken trail is a server error, not a silent empty page
    let err = dashboard.list_audit_logs(&ctx, AuditLogFilter::default()).unwrap_err();
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_failed_conversion_rolls_back() {
    let dir = TempDir::new().unwrap();
    let config = config_at(&dir);
    let dashboard = Dashboard::open(config.clone()).unwrap();
    let ctx = admin_context(&dashboard);
    let created = dashboard.create_lead(&ctx, lead("Rollback")).unwrap();

    // Payments can no longer be written, so the conversion must fail as a whole
    let side = rusqlite::Connection::open(&config.database_path).unwrap();
    side.execute_batch("DROP TABLE payments").unwrap();
    drop(side);

    let err = dashboard
        .convert_lead(&ctx, NewOrder::new(&created.id, 500, 500, 200, PaymentStatus::Partial))
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.client_message(), "internal server error");

    let after = dashboard.get_lead(&ctx, &created.id).unwrap();
    assert_eq!(after.status, LeadStatus::New);
    let db = Database::open(&config.database_path).unwrap();
    assert!(db.get_order_by_lead(&created.id).unwrap().is_none());
}

#[test]
fn test_failed_update_leaves_order_untouched() {
    let dir = TempDir::new().unwrap();
    let config = config_at(&dir);
    let dashboard = Dashboard::open(config.clone()).unwrap();
    let ctx = admin_context(&dashboard);
    let created = dashboard.create_lead(&ctx, lead("Atomic")).unwrap();
    let detail = dashboard
        .convert_lead(&ctx, NewOrder::new(&created.id, 500, 500, 0, PaymentStatus::Pending))
        .unwrap();

    let side = rusqlite::Connection::open(&config.database_path).unwrap();
    side.execute_batch("DROP TABLE payments").unwrap();
    drop(side);

    // An error means nothing was committed, even without a new payment
    let update = OrderUpdate {
        status: Some(OrderStatus::Cancelled),
        ..Default::default()
    };
    let err = dashboard.update_order(&ctx, &detail.order.id, update).unwrap_err();
    assert_eq!(err.status_code(), 500);

    let db = Database::open(&config.database_path).unwrap();
    let order = db.get_order(&detail.order.id).unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_payments_sum_to_received(initial in 0i64..1_000, steps in prop::collection::vec(0i64..500, 0..8)) {
        let dashboard = Dashboard::open_in_memory(DashboardConfig {
            rate_limit: medorder_core::RateLimitConfig {
                max_requests: 10_000,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let ctx = admin_context(&dashboard);
        let created = dashboard.create_lead(&ctx, lead("Ledger")).unwrap();
        let detail = dashboard
            .convert_lead(&ctx, NewOrder::new(&created.id, 10_000, 10_000, initial, PaymentStatus::Partial))
            .unwrap();

        let mut received = initial;
        for step in steps {
            received += step;
            let update = OrderUpdate {
                received_amount: Some(received),
                ..Default::default()
            };
            dashboard.update_order(&ctx, &detail.order.id, update).unwrap();
        }

        let order = dashboard.get_order(&ctx, &detail.order.id).unwrap();
        prop_assert_eq!(order.order.received_amount, received);
        prop_assert_eq!(order.payments.iter().map(|p| p.amount).sum::<i64>(), received);
        prop_assert!(order.payments.iter().all(|p| p.amount > 0));
    }
}
