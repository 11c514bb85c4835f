//! Order and payment ledger database operations.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{like_pattern, parse_stored, text, Database, DbError, DbResult, WhereClause};
use crate::models::{
    Address, Order, OrderFilter, OrderStatus, PageRequest, Payment, PaymentStatus,
    PaymentType,
};

const ORDER_COLUMNS: &str = r#"
    o.id, o.order_number, o.lead_id, o.patient_name, o.phone, o.total_amount, o.vpp_amount,
    o.epp_amount, o.received_amount, o.payment_status, o.payment_method, o.payment_reference,
    o.status, o.address_line1, o.address_line2, o.address_line3, o.address_line4,
    o.address_line5, o.address_line6, o.pincode, o.city, o.tracking_id, o.courier,
    o.weight_kg, o.dispatch_date, o.dispatched_by, o.delivery_date, o.return_date,
    o.return_reason, o.notes, o.booked_by, o.assigned_to, o.created_at, o.updated_at
"#;

impl Database {
    /// Insert a new order.
    pub fn insert_order(&self, order: &Order) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO orders (
                id, order_number, lead_id, patient_name, phone, total_amount, vpp_amount,
                epp_amount, received_amount, payment_status, payment_method, payment_reference,
                status, address_line1, address_line2, address_line3, address_line4,
                address_line5, address_line6, pincode, city, tracking_id, courier,
                weight_kg, dispatch_date, dispatched_by, delivery_date, return_date,
                return_reason, notes, booked_by, assigned_to, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                      ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30,
                      ?31, ?32, ?33, ?34)
            "#,
            params![
                order.id,
                order.order_number,
                order.lead_id,
                order.patient_name,
                order.phone,
                order.total_amount,
                order.vpp_amount,
                order.epp_amount,
                order.received_amount,
                order.payment_status.as_str(),
                order.payment_method,
                order.payment_reference,
                order.status.as_str(),
                order.address.address_line1,
                order.address.address_line2,
                order.address.address_line3,
                order.address.address_line4,
                order.address.address_line5,
                order.address.address_line6,
                order.address.pincode,
                order.address.city,
                order.tracking_id,
                order.courier,
                order.weight_kg,
                order.dispatch_date,
                order.dispatched_by,
                order.delivery_date,
                order.return_date,
                order.return_reason,
                order.notes,
                order.booked_by,
                order.assigned_to,
                order.created_at,
                order.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing order. The order number, lead and booker never change.
    pub fn update_order(&self, order: &Order) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE orders SET
                patient_name = ?2, phone = ?3, total_amount = ?4, vpp_amount = ?5,
                epp_amount = ?6, received_amount = ?7, payment_status = ?8,
                payment_method = ?9, payment_reference = ?10, status = ?11,
                address_line1 = ?12, address_line2 = ?13, address_line3 = ?14,
                address_line4 = ?15, address_line5 = ?16, address_line6 = ?17,
                pincode = ?18, city = ?19, tracking_id = ?20, courier = ?21, weight_kg = ?22,
                dispatch_date = ?23, dispatched_by = ?24, delivery_date = ?25,
                return_date = ?26, return_reason = ?27, notes = ?28, assigned_to = ?29,
                updated_at = ?30
            WHERE id = ?1
            "#,
            params![
                order.id,
                order.patient_name,
                order.phone,
                order.total_amount,
                order.vpp_amount,
                order.epp_amount,
                order.received_amount,
                order.payment_status.as_str(),
                order.payment_method,
                order.payment_reference,
                order.status.as_str(),
                order.address.address_line1,
                order.address.address_line2,
                order.address.address_line3,
                order.address.address_line4,
                order.address.address_line5,
                order.address.address_line6,
                order.address.pincode,
                order.address.city,
                order.tracking_id,
                order.courier,
                order.weight_kg,
                order.dispatch_date,
                order.dispatched_by,
                order.delivery_date,
                order.return_date,
                order.return_reason,
                order.notes,
                order.assigned_to,
                order.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an order by ID.
    pub fn get_order(&self, id: &str) -> DbResult<Option<Order>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM orders o WHERE o.id = ?", ORDER_COLUMNS),
                [id],
                order_row,
            )
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    /// Get the order created from a lead, if any.
    pub fn get_order_by_lead(&self, lead_id: &str) -> DbResult<Option<Order>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM orders o WHERE o.lead_id = ?", ORDER_COLUMNS),
                [lead_id],
                order_row,
            )
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    /// Check whether an order number is already taken.
    pub fn order_number_exists(&self, order_number: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = ?)",
            [order_number],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// List orders matching a filter, newest first. Returns the page and the total count.
    pub fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> DbResult<(Vec<Order>, u64)> {
        let mut clause = WhereClause::new();
        if let Some(status) = filter.status {
            clause.push("o.status = ?", [text(status.as_str())]);
        }
        if let Some(payment_status) = filter.payment_status {
            clause.push("o.payment_status = ?", [text(payment_status.as_str())]);
        }
        if let Some(from) = &filter.dispatched_from {
            clause.push("o.dispatch_date >= ?", [text(from)]);
        }
        if let Some(to) = &filter.dispatched_to {
            clause.push("o.dispatch_date <= ?", [text(to)]);
        }
        if let Some(assigned_to) = &filter.assigned_to {
            clause.push("o.assigned_to = ?", [text(assigned_to)]);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clause.push(
                "(o.order_number LIKE ? ESCAPE '\\' OR o.patient_name LIKE ? ESCAPE '\\' \
                 OR o.tracking_id LIKE ? ESCAPE '\\' OR l.phone LIKE ? ESCAPE '\\')",
                [
                    like_pattern(search),
                    like_pattern(search),
                    like_pattern(search),
                    like_pattern(search),
                ],
            );
        }

        let from = "orders o LEFT JOIN leads l ON l.id = o.lead_id";
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{}", from, clause.sql()),
            params_from_iter(clause.args()),
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {}{} ORDER BY o.created_at DESC, o.id LIMIT ? OFFSET ?",
            ORDER_COLUMNS,
            from,
            clause.sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.paged_args(page.limit, page.offset())), order_row)?;

        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?.try_into()?);
        }
        Ok((orders, total as u64))
    }

    /// Delete an order and, by cascade, its payments.
    pub fn delete_order(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM orders WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Payments (append-only)
    // =========================================================================

    /// Append a payment to the ledger.
    pub fn insert_payment(&self, payment: &Payment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO payments (
                id, order_id, amount, payment_type, method, reference, received_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                payment.id,
                payment.order_id,
                payment.amount,
                payment.payment_type.as_str(),
                payment.method,
                payment.reference,
                payment.received_by,
                payment.created_at,
            ],
        )?;
        Ok(())
    }

    /// Payments for an order, oldest first.
    pub fn list_payments(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, order_id, amount, payment_type, method, reference, received_by, created_at
            FROM payments
            WHERE order_id = ?
            ORDER BY created_at, rowid
            "#,
        )?;
        let rows = stmt.query_map([order_id], |row| {
            Ok((
                Payment {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    amount: row.get(2)?,
                    payment_type: PaymentType::Initial,
                    method: row.get(4)?,
                    reference: row.get(5)?,
                    received_by: row.get(6)?,
                    created_at: row.get(7)?,
                },
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut payments = Vec::new();
        for row in rows {
            let (mut payment, payment_type) = row?;
            payment.payment_type = parse_stored(&payment_type, "payment type", PaymentType::parse)?;
            payments.push(payment);
        }
        Ok(payments)
    }

}

/// Intermediate row struct for database mapping.
struct OrderRow {
    order: Order,
    payment_status: String,
    status: String,
}

fn order_row(row: &Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        order: Order {
            id: row.get(0)?,
            order_number: row.get(1)?,
            lead_id: row.get(2)?,
            patient_name: row.get(3)?,
            phone: row.get(4)?,
            total_amount: row.get(5)?,
            vpp_amount: row.get(6)?,
            epp_amount: row.get(7)?,
            received_amount: row.get(8)?,
            payment_status: PaymentStatus::Pending,
            payment_method: row.get(10)?,
            payment_reference: row.get(11)?,
            status: OrderStatus::Pending,
            address: Address {
                address_line1: row.get(13)?,
                address_line2: row.get(14)?,
                address_line3: row.get(15)?,
                address_line4: row.get(16)?,
                address_line5: row.get(17)?,
                address_line6: row.get(18)?,
                pincode: row.get(19)?,
                city: row.get(20)?,
            },
            tracking_id: row.get(21)?,
            courier: row.get(22)?,
            weight_kg: row.get(23)?,
            dispatch_date: row.get(24)?,
            dispatched_by: row.get(25)?,
            delivery_date: row.get(26)?,
            return_date: row.get(27)?,
            return_reason: row.get(28)?,
            notes: row.get(29)?,
            booked_by: row.get(30)?,
            assigned_to: row.get(31)?,
            created_at: row.get(32)?,
            updated_at: row.get(33)?,
        },
        payment_status: row.get(9)?,
        status: row.get(12)?,
    })
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let mut order = row.order;
        order.payment_status = parse_stored(&row.payment_status, "payment status", PaymentStatus::parse)?;
        order.status = parse_stored(&row.status, "order status", OrderStatus::parse)?;
        Ok(order)
    }
}
