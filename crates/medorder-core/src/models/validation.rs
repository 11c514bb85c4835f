//! Field-level validation results for request bodies.

use serde::{Deserialize, Serialize};

/// A single invalid field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the field (camelCase)
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Every problem found in one request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field shorthand.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check whether a given field was reported.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was reported.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub(crate) fn require_text(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", field));
        }
    }

    pub(crate) fn check_phone(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, format!("{} is required", field));
            return;
        }
        let digits = value.strip_prefix('+').unwrap_or(value);
        if !digits.chars().all(|c| c.is_ascii_digit()) || !(10..=15).contains(&digits.len()) {
            self.push(field, "phone must be 10 to 15 digits");
        }
    }

    pub(crate) fn check_email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        };
        if !valid {
            self.push(field, "invalid email address");
        }
    }

    pub(crate) fn check_non_negative(&mut self, field: &str, value: i64) {
        if value < 0 {
            self.push(field, format!("{} cannot be negative", field));
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
