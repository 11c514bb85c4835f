//! Order and payment models.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{Address, AddressPatch, Amount, Lead, Patch, ValidationErrors};

/// Fulfilment status.
///
/// The happy path is `Pending → PaymentReceived → Dispatched → InTransit →
/// Delivered → Paid`; `Returned` and `Cancelled` are alternate end states.
/// Updates may write any status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    PaymentReceived,
    Dispatched,
    InTransit,
    Delivered,
    Paid,
    Returned,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::PaymentReceived => "PAYMENT_RECEIVED",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "PAYMENT_RECEIVED" => Some(OrderStatus::PaymentReceived),
            "DISPATCHED" => Some(OrderStatus::Dispatched),
            "IN_TRANSIT" => Some(OrderStatus::InTransit),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "PAID" => Some(OrderStatus::Paid),
            "RETURNED" => Some(OrderStatus::Returned),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Human label used in notification text.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentReceived => "payment received",
            OrderStatus::Dispatched => "dispatched",
            OrderStatus::InTransit => "in transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Paid => "paid",
            OrderStatus::Returned => "returned",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Full,
    Custom,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Full => "FULL",
            PaymentStatus::Custom => "CUSTOM",
            PaymentStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PARTIAL" => Some(PaymentStatus::Partial),
            "FULL" => Some(PaymentStatus::Full),
            "CUSTOM" => Some(PaymentStatus::Custom),
            "COMPLETED" => Some(PaymentStatus::Completed),
            _ => None,
        }
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// First money received against the order
    Initial,
    /// Any later increase
    Partial,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Initial => "INITIAL",
            PaymentType::Partial => "PARTIAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INITIAL" => Some(PaymentType::Initial),
            "PARTIAL" => Some(PaymentType::Partial),
            _ => None,
        }
    }

    /// Ledger type for money arriving on top of `previously_received`.
    pub fn for_increase(previously_received: Amount) -> Self {
        if previously_received == 0 {
            PaymentType::Initial
        } else {
            PaymentType::Partial
        }
    }
}

/// A confirmed sale derived from exactly one lead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique order ID
    pub id: String,
    /// Human-readable order number, e.g. `ORD12345678123`
    pub order_number: String,
    /// Source lead
    pub lead_id: String,
    /// Copied from the lead at conversion
    pub patient_name: String,
    pub phone: String,
    pub total_amount: Amount,
    /// VPP (estimated) amount
    pub vpp_amount: Amount,
    /// EPP (extra fee) amount
    pub epp_amount: Option<Amount>,
    /// Running total of money received; equals the sum of payments
    pub received_amount: Amount,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub status: OrderStatus,
    #[serde(flatten)]
    pub address: Address,
    pub tracking_id: Option<String>,
    pub courier: Option<String>,
    /// Parcel weight
    pub weight_kg: Option<f64>,
    pub dispatch_date: Option<String>,
    /// Set once, on the first move to `Dispatched`
    pub dispatched_by: Option<String>,
    pub delivery_date: Option<String>,
    pub return_date: Option<String>,
    pub return_reason: Option<String>,
    pub notes: Option<String>,
    /// User who created the order
    pub booked_by: String,
    /// Owning employee
    pub assigned_to: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    /// Start an order for `lead`, booked and owned by the given users.
    pub fn from_lead(lead: &Lead, order_number: String, booked_by: String, assigned_to: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            order_number,
            lead_id: lead.id.clone(),
            patient_name: lead.name.clone(),
            phone: lead.phone.clone(),
            total_amount: 0,
            vpp_amount: 0,
            epp_amount: None,
            received_amount: 0,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            payment_reference: None,
            status: OrderStatus::Pending,
            address: lead.address.clone(),
            tracking_id: None,
            courier: None,
            weight_kg: None,
            dispatch_date: None,
            dispatched_by: None,
            delivery_date: None,
            return_date: None,
            return_reason: None,
            notes: None,
            booked_by,
            assigned_to,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Amount still owed against the total.
    pub fn outstanding(&self) -> Amount {
        (self.total_amount + self.epp_amount.unwrap_or(0) - self.received_amount).max(0)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Stored form of order dates: UTC, whole seconds, `Z` suffix.
///
/// Fixed width, so stored dates compare correctly as text.
pub fn order_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp with any offset into its stored form.
pub fn normalize_order_date(value: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|at| order_timestamp(at.with_timezone(&Utc)))
}

/// A range bound: an RFC 3339 timestamp, or a `YYYY-MM-DD` date covering
/// that whole UTC day.
fn normalize_range_bound(value: &str, end_of_day: bool) -> Option<String> {
    if let Some(at) = normalize_order_date(value) {
        return Some(at);
    }
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    }?;
    Some(order_timestamp(Utc.from_utc_datetime(&time)))
}

/// An immutable ledger entry for one money movement against an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub amount: Amount,
    pub payment_type: PaymentType,
    pub method: Option<String>,
    pub reference: Option<String>,
    /// User who recorded the money
    pub received_by: String,
    pub created_at: String,
}

impl Payment {
    pub fn new(
        order_id: String,
        amount: Amount,
        payment_type: PaymentType,
        method: Option<String>,
        reference: Option<String>,
        received_by: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            order_id,
            amount,
            payment_type,
            method,
            reference,
            received_by,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// An order together with its payment history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order: Order,
    pub payments: Vec<Payment>,
}

/// Body for converting a lead into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub lead_id: String,
    pub received_amount: Amount,
    pub payment_status: PaymentStatus,
    pub total_amount: Amount,
    pub vpp_amount: Amount,
    pub epp_amount: Option<Amount>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    /// Address lines default to the lead's when none are supplied
    pub address: Option<Address>,
    pub notes: Option<String>,
    /// Honoured for admins only
    pub assigned_to: Option<String>,
}

impl NewOrder {
    /// Required fields only.
    pub fn new(
        lead_id: impl Into<String>,
        total_amount: Amount,
        vpp_amount: Amount,
        received_amount: Amount,
        payment_status: PaymentStatus,
    ) -> Self {
        Self {
            lead_id: lead_id.into(),
            received_amount,
            payment_status,
            total_amount,
            vpp_amount,
            epp_amount: None,
            payment_method: None,
            payment_reference: None,
            address: None,
            notes: None,
            assigned_to: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("leadId", &self.lead_id);
        errors.check_non_negative("receivedAmount", self.received_amount);
        errors.check_non_negative("totalAmount", self.total_amount);
        errors.check_non_negative("vppAmount", self.vpp_amount);
        if let Some(epp) = self.epp_amount {
            errors.check_non_negative("eppAmount", epp);
        }
        errors.into_result()
    }
}

/// Body for a partial order update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    /// New running total; may only grow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpp_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub epp_amount: Patch<Amount>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub payment_method: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub payment_reference: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub tracking_id: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub courier: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub weight_kg: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub dispatch_date: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub delivery_date: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub return_date: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub return_reason: Patch<String>,
    #[serde(flatten)]
    pub address: AddressPatch,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub notes: Patch<String>,
    /// Stripped for employees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl OrderUpdate {
    pub fn validate(&self, current: &Order) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(received) = self.received_amount {
            errors.check_non_negative("receivedAmount", received);
            if received < current.received_amount {
                errors.push("receivedAmount", "receivedAmount cannot decrease");
            }
        }
        if let Some(total) = self.total_amount {
            errors.check_non_negative("totalAmount", total);
        }
        if let Some(vpp) = self.vpp_amount {
            errors.check_non_negative("vppAmount", vpp);
        }
        if let Patch::Value(epp) = self.epp_amount {
            errors.check_non_negative("eppAmount", epp);
        }
        if let Patch::Value(weight) = self.weight_kg {
            if !weight.is_finite() || weight < 0.0 {
                errors.push("weightKg", "weightKg must be a non-negative number");
            }
        }
        for (field, value) in [
            ("dispatchDate", &self.dispatch_date),
            ("deliveryDate", &self.delivery_date),
            ("returnDate", &self.return_date),
        ] {
            if let Patch::Value(date) = value {
                if chrono::DateTime::parse_from_rfc3339(date).is_err() {
                    errors.push(field, format!("{} must be an RFC 3339 timestamp", field));
                }
            }
        }
        errors.into_result()
    }

    /// Apply every present field to `order`, leaving dispatcher stamping and
    /// payment bookkeeping to the caller.
    pub fn apply_to(self, order: &mut Order) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(payment_status) = self.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(received) = self.received_amount {
            order.received_amount = received;
        }
        if let Some(total) = self.total_amount {
            order.total_amount = total;
        }
        if let Some(vpp) = self.vpp_amount {
            order.vpp_amount = vpp;
        }
        self.epp_amount.apply_to(&mut order.epp_amount);
        self.payment_method.apply_to(&mut order.payment_method);
        self.payment_reference.apply_to(&mut order.payment_reference);
        self.tracking_id.apply_to(&mut order.tracking_id);
        self.courier.apply_to(&mut order.courier);
        self.weight_kg.apply_to(&mut order.weight_kg);
        self.dispatch_date
            .map(|d| normalize_order_date(&d).unwrap_or(d))
            .apply_to(&mut order.dispatch_date);
        self.delivery_date
            .map(|d| normalize_order_date(&d).unwrap_or(d))
            .apply_to(&mut order.delivery_date);
        self.return_date
            .map(|d| normalize_order_date(&d).unwrap_or(d))
            .apply_to(&mut order.return_date);
        self.return_reason.apply_to(&mut order.return_reason);
        self.address.apply_to(&mut order.address);
        self.notes.apply_to(&mut order.notes);
        if let Some(assigned_to) = self.assigned_to {
            order.assigned_to = assigned_to;
        }
        order.touch();
    }
}

/// Listing filters for orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Inclusive lower bound on dispatch date (RFC 3339 or `YYYY-MM-DD`)
    pub dispatched_from: Option<String>,
    /// Inclusive upper bound on dispatch date (RFC 3339 or `YYYY-MM-DD`)
    pub dispatched_to: Option<String>,
    /// Matches order number, patient name, tracking ID or lead phone
    pub search: Option<String>,
    /// Restrict to one assignee; forced for employees
    pub assigned_to: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderFilter {
    /// Validate the dispatch-date bounds and rewrite them into stored form.
    pub fn normalize_dispatch_range(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, bound, end_of_day) in [
            ("dispatchedFrom", &mut self.dispatched_from, false),
            ("dispatchedTo", &mut self.dispatched_to, true),
        ] {
            let Some(value) = bound.take() else { continue };
            match normalize_range_bound(&value, end_of_day) {
                Some(normalized) => *bound = Some(normalized),
                None => errors.push(field, format!("{} must be a date or an RFC 3339 timestamp", field)),
            }
        }
        errors.into_result()
    }
}
