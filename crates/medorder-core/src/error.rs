//! Service-level error taxonomy.

use thiserror::Error;

use crate::db::DbError;
use crate::models::ValidationErrors;

/// Errors returned by [`crate::Dashboard`] operations.
///
/// Each variant maps onto one response class of the web layer via
/// [`ServiceError::status_code`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("too many requests")]
    TooManyRequests,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unauthorized => 401,
            ServiceError::Forbidden(_) => 403,
            ServiceError::Validation(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Conflict(_) => 409,
            ServiceError::TooManyRequests => 429,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Message safe to show a client; internal detail is withheld.
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Field-level errors, for validation failures.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ServiceError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub(crate) fn forbidden(reason: &str) -> Self {
        ServiceError::Forbidden(reason.to_string())
    }

    pub(crate) fn not_found(what: &str, id: &str) -> Self {
        ServiceError::NotFound(format!("{} {}", what, id))
    }
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => ServiceError::NotFound(what),
            other => {
                tracing::error!(error = %other, "database failure");
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl<T> From<std::sync::PoisonError<T>> for ServiceError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        tracing::error!("database lock poisoned: {}", e);
        ServiceError::Internal(format!("Lock poisoned: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::Unauthorized.status_code(), 401);
        assert_eq!(ServiceError::forbidden("nope").status_code(), 403);
        assert_eq!(ServiceError::Validation(ValidationErrors::new()).status_code(), 400);
        assert_eq!(ServiceError::not_found("Lead", "x").status_code(), 404);
        assert_eq!(ServiceError::TooManyRequests.status_code(), 429);
        assert_eq!(ServiceError::Internal("disk".into()).status_code(), 500);
    }

    #[test]
    fn test_internal_detail_withheld() {
        let err = ServiceError::from(DbError::Constraint("UNIQUE failed: users.email".into()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.client_message(), "internal server error");
    }

    #[test]
    fn test_validation_keeps_field_list() {
        let err = ServiceError::from(ValidationErrors::single("phone", "phone is required"));
        assert!(err.validation_errors().unwrap().has_field("phone"));
    }
}
