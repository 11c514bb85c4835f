//! Per-user inbox notifications.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    LeadAssigned,
    LeadStatusChanged,
    OrderCreated,
    OrderAssigned,
    OrderDispatched,
    OrderStatusChanged,
    PaymentReceived,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LeadAssigned => "LEAD_ASSIGNED",
            NotificationType::LeadStatusChanged => "LEAD_STATUS_CHANGED",
            NotificationType::OrderCreated => "ORDER_CREATED",
            NotificationType::OrderAssigned => "ORDER_ASSIGNED",
            NotificationType::OrderDispatched => "ORDER_DISPATCHED",
            NotificationType::OrderStatusChanged => "ORDER_STATUS_CHANGED",
            NotificationType::PaymentReceived => "PAYMENT_RECEIVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LEAD_ASSIGNED" => Some(NotificationType::LeadAssigned),
            "LEAD_STATUS_CHANGED" => Some(NotificationType::LeadStatusChanged),
            "ORDER_CREATED" => Some(NotificationType::OrderCreated),
            "ORDER_ASSIGNED" => Some(NotificationType::OrderAssigned),
            "ORDER_DISPATCHED" => Some(NotificationType::OrderDispatched),
            "ORDER_STATUS_CHANGED" => Some(NotificationType::OrderStatusChanged),
            "PAYMENT_RECEIVED" => Some(NotificationType::PaymentReceived),
            _ => None,
        }
    }
}

/// An inbox item for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields shared by every copy of a fanned-out notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
}

impl NotificationDraft {
    pub fn new(kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Link the notification to an entity.
    pub fn about(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Materialize an unread notification for `user_id`.
    pub fn for_user(&self, user_id: &str) -> Notification {
        let now = chrono::Utc::now().to_rfc3339();
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: self.kind,
            title: self.title.clone(),
            message: self.message.clone(),
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            is_read: false,
            read_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
