//! Lead models: prospective patients prior to a confirmed sale.

use serde::{Deserialize, Serialize};

use super::{Address, AddressPatch, Amount, Patch, ValidationErrors};

/// Lead status.
///
/// Any status may be written through an update; only the conversion flow
/// sets `Converted` as part of creating an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    /// Freshly captured
    New,
    /// First contact made
    Contacted,
    /// Confirmed interest
    Qualified,
    /// Turned into an order (terminal)
    Converted,
    /// Dropped (terminal)
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::Contacted => "CONTACTED",
            LeadStatus::Qualified => "QUALIFIED",
            LeadStatus::Converted => "CONVERTED",
            LeadStatus::Lost => "LOST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(LeadStatus::New),
            "CONTACTED" => Some(LeadStatus::Contacted),
            "QUALIFIED" => Some(LeadStatus::Qualified),
            "CONVERTED" => Some(LeadStatus::Converted),
            "LOST" => Some(LeadStatus::Lost),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }
}

/// Channel a lead came in through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    Website,
    Facebook,
    Instagram,
    GoogleAds,
    Referral,
    WalkIn,
    PhoneCall,
    Other,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Website => "WEBSITE",
            LeadSource::Facebook => "FACEBOOK",
            LeadSource::Instagram => "INSTAGRAM",
            LeadSource::GoogleAds => "GOOGLE_ADS",
            LeadSource::Referral => "REFERRAL",
            LeadSource::WalkIn => "WALK_IN",
            LeadSource::PhoneCall => "PHONE_CALL",
            LeadSource::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEBSITE" => Some(LeadSource::Website),
            "FACEBOOK" => Some(LeadSource::Facebook),
            "INSTAGRAM" => Some(LeadSource::Instagram),
            "GOOGLE_ADS" => Some(LeadSource::GoogleAds),
            "REFERRAL" => Some(LeadSource::Referral),
            "WALK_IN" => Some(LeadSource::WalkIn),
            "PHONE_CALL" => Some(LeadSource::PhoneCall),
            "OTHER" => Some(LeadSource::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl LeadPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadPriority::Low => "LOW",
            LeadPriority::Medium => "MEDIUM",
            LeadPriority::High => "HIGH",
            LeadPriority::Urgent => "URGENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(LeadPriority::Low),
            "MEDIUM" => Some(LeadPriority::Medium),
            "HIGH" => Some(LeadPriority::High),
            "URGENT" => Some(LeadPriority::Urgent),
            _ => None,
        }
    }
}

/// A prospective patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Unique lead ID
    pub id: String,
    /// Patient name
    pub name: String,
    /// Contact phone
    pub phone: String,
    pub email: Option<String>,
    /// Condition the patient is enquiring about
    pub disease: Option<String>,
    /// How long the condition has been present (free text)
    pub duration: Option<String>,
    pub patient_history: Option<String>,
    /// Estimated order value
    pub estimated_value: Option<Amount>,
    #[serde(flatten)]
    pub address: Address,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub priority: LeadPriority,
    /// Owning employee (user ID)
    pub assigned_to: String,
    /// User who captured the lead
    pub created_by: String,
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Lead {
    /// Create a new lead owned by its creator.
    pub fn new(name: String, phone: String, created_by: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            phone,
            email: None,
            disease: None,
            duration: None,
            patient_history: None,
            estimated_value: None,
            address: Address::default(),
            source: LeadSource::Other,
            status: LeadStatus::New,
            priority: LeadPriority::Medium,
            assigned_to: created_by.clone(),
            created_by,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_converted(&self) -> bool {
        self.status == LeadStatus::Converted
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Body for creating a lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub email: Option<String>,
    pub disease: Option<String>,
    pub duration: Option<String>,
    pub patient_history: Option<String>,
    pub estimated_value: Option<Amount>,
    #[serde(flatten)]
    pub address: Address,
    pub source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    /// Honoured for admins only
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

impl NewLead {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name);
        errors.check_phone("phone", &self.phone);
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            errors.check_email("email", email);
        }
        if let Some(value) = self.estimated_value {
            errors.check_non_negative("estimatedValue", value);
        }
        if self.status == Some(LeadStatus::Converted) {
            errors.push("status", "a lead is only converted by creating an order");
        }
        errors.into_result()
    }

    /// Build the stored lead for `created_by`, owned by `assigned_to`.
    pub fn into_lead(self, created_by: String, assigned_to: String) -> Lead {
        let mut lead = Lead::new(self.name.trim().to_string(), self.phone.trim().to_string(), created_by);
        lead.email = self.email.filter(|e| !e.trim().is_empty());
        lead.disease = self.disease;
        lead.duration = self.duration;
        lead.patient_history = self.patient_history;
        lead.estimated_value = self.estimated_value;
        lead.address = self.address;
        lead.source = self.source.unwrap_or(LeadSource::Other);
        lead.status = self.status.unwrap_or(LeadStatus::New);
        lead.priority = self.priority.unwrap_or(LeadPriority::Medium);
        lead.assigned_to = assigned_to;
        lead.notes = self.notes;
        lead
    }
}

/// Body for a partial lead update.
///
/// `phone` is always required; every other key may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub email: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub disease: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub duration: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub patient_history: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub estimated_value: Patch<Amount>,
    #[serde(flatten)]
    pub address: AddressPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LeadSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<LeadPriority>,
    /// Stripped for employees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub notes: Patch<String>,
}

impl LeadUpdate {
    /// Minimal update carrying the (required) phone number.
    pub fn with_phone(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.require_text("name", name);
        }
        errors.check_phone("phone", &self.phone);
        if let Patch::Value(email) = &self.email {
            errors.check_email("email", email);
        }
        if let Patch::Value(value) = self.estimated_value {
            errors.check_non_negative("estimatedValue", value);
        }
        errors.into_result()
    }

    /// Apply every present field to `lead`. Ownership rules are the caller's job.
    pub fn apply_to(self, lead: &mut Lead) {
        if let Some(name) = self.name {
            lead.name = name.trim().to_string();
        }
        lead.phone = self.phone.trim().to_string();
        self.email.apply_to(&mut lead.email);
        self.disease.apply_to(&mut lead.disease);
        self.duration.apply_to(&mut lead.duration);
        self.patient_history.apply_to(&mut lead.patient_history);
        self.estimated_value.apply_to(&mut lead.estimated_value);
        self.address.apply_to(&mut lead.address);
        if let Some(source) = self.source {
            lead.source = source;
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(priority) = self.priority {
            lead.priority = priority;
        }
        if let Some(assigned_to) = self.assigned_to {
            lead.assigned_to = assigned_to;
        }
        self.notes.apply_to(&mut lead.notes);
        lead.touch();
    }
}

/// Listing filters for leads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    pub source: Option<LeadSource>,
    /// Matches name, phone or email
    pub search: Option<String>,
    /// Restrict to one assignee; forced for employees
    pub assigned_to: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Body for reassigning many leads at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssign {
    pub lead_ids: Vec<String>,
    pub assigned_to: String,
}

/// Result of a bulk reassignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignOutcome {
    /// Leads now owned by the target
    pub assigned: Vec<String>,
    /// Requested IDs that do not exist
    pub missing: Vec<String>,
}
