//! Medorder Core Library
//!
//! Workflow core of an internal dashboard for a medical-order business:
//! sales leads are captured, converted into orders, and tracked through
//! payment, dispatch and delivery.
//!
//! # Architecture
//!
//! ```text
//! request ─► rate limiter ─► actor ─► permission / ownership
//!                                              │
//!                                     ┌────────▼────────┐
//!                                     │   transaction   │
//!                                     │ lead · order ·  │
//!                                     │ payment ledger  │
//!                                     └────────┬────────┘
//!                                              │ commit
//!                              ┌───────────────┴───────────────┐
//!                              ▼                               ▼
//!                         audit trail                 notification inbox
//!                       (best-effort)                   (best-effort)
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite storage layer
//! - [`models`]: Domain types (Lead, Order, Payment, User, etc.)
//! - [`access`]: Permission checks and rate limiting
//! - [`effects`]: Audit and notification recorders
//! - [`service`]: The [`Dashboard`] facade
//! - [`config`]: Startup configuration

pub mod access;
pub mod config;
pub mod db;
pub mod effects;
pub mod error;
pub mod models;
pub mod order_number;
pub mod service;

// Re-export commonly used types
pub use access::{InMemoryRateLimitStore, PermissionChecker, RateLimitStore, RateLimiter, SweepTask};
pub use config::{ConfigError, DashboardConfig, RateLimitConfig};
pub use db::{Database, DbError, DbResult};
pub use error::{ServiceError, ServiceResult};
pub use models::{
    Address, AuditAction, AuditLog, AuditLogFilter, BulkAssign, BulkAssignOutcome, Lead, LeadFilter, LeadPriority,
    LeadSource, LeadStatus, LeadUpdate, NewLead, NewOrder, NewRole, NewUser, Notification, NotificationType, Order,
    OrderDetail, OrderFilter, OrderStatus, OrderUpdate, Page, Pagination, Patch, Payment, PaymentStatus, PaymentType,
    Permission, Role, User, UserFilter, UserRole, UserUpdate, ValidationErrors,
};
pub use order_number::OrderNumberGenerator;
pub use service::{Dashboard, RequestContext};
