//! The `Dashboard` facade: every operation a web layer calls.
//!
//! Each operation follows the same pipeline: rate-limit gate (writes only),
//! actor resolution, permission or ownership gate, storage work (inside a
//! transaction where several rows change together), then best-effort audit
//! and notification side effects.

mod audit_logs;
mod leads;
mod notifications;
mod orders;
mod users;

pub use users::{hash_password, verify_password};

use std::sync::{Mutex, MutexGuard};

use crate::access::{RateLimiter, SweepTask};
use crate::config::DashboardConfig;
use crate::db::Database;
use crate::effects::Actor;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{PageRequest, User, ValidationErrors};
use crate::order_number::OrderNumberGenerator;

/// Client key used when a request carries no IP address.
const UNKNOWN_CLIENT: &str = "unknown";

/// Who is calling, and from where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated user, if any
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Context for an unauthenticated request.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn from_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub(crate) fn actor(&self) -> Actor<'_> {
        Actor {
            user_id: self.user_id.as_deref(),
            ip_address: self.ip_address.as_deref(),
            user_agent: self.user_agent.as_deref(),
        }
    }

    fn client_key(&self) -> &str {
        self.ip_address.as_deref().unwrap_or(UNKNOWN_CLIENT)
    }
}

/// Thread-safe service over one SQLite connection.
pub struct Dashboard {
    db: Mutex<Database>,
    config: DashboardConfig,
    limiter: RateLimiter,
    order_numbers: OrderNumberGenerator,
}

impl Dashboard {
    /// Wrap an open database.
    pub fn new(db: Database, config: DashboardConfig) -> Self {
        let limiter = RateLimiter::in_memory(&config.rate_limit);
        Self::with_rate_limiter(db, config, limiter)
    }

    /// Wrap an open database, sharing an existing limiter.
    pub fn with_rate_limiter(db: Database, config: DashboardConfig, limiter: RateLimiter) -> Self {
        let order_numbers = OrderNumberGenerator::new(config.order_number_prefix.clone());
        Self {
            db: Mutex::new(db),
            config,
            limiter,
            order_numbers,
        }
    }

    /// Open (or create) the database named by the configuration.
    pub fn open(config: DashboardConfig) -> ServiceResult<Self> {
        let db = Database::open(&config.database_path)?;
        tracing::info!(path = %config.database_path.display(), "database opened");
        Ok(Self::new(db, config))
    }

    /// In-memory database (for testing).
    pub fn open_in_memory(config: DashboardConfig) -> ServiceResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::new(db, config))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Start the periodic purge of expired rate-limit windows.
    ///
    /// The returned task stops when dropped.
    pub fn spawn_rate_limit_sweeper(&self) -> std::io::Result<SweepTask> {
        SweepTask::spawn(self.limiter.store(), self.config.rate_limit.sweep_interval)
    }

    fn lock(&self) -> ServiceResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    fn check_rate(&self, ctx: &RequestContext) -> ServiceResult<()> {
        if self.limiter.allow(ctx.client_key()) {
            Ok(())
        } else {
            Err(ServiceError::TooManyRequests)
        }
    }

    fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        PageRequest::resolve(page, limit, self.config.default_page_size, self.config.max_page_size)
    }
}

/// Load the acting user; missing or inactive users are unauthorized.
fn resolve_actor(db: &Database, ctx: &RequestContext) -> ServiceResult<User> {
    let user_id = ctx.user_id.as_deref().ok_or(ServiceError::Unauthorized)?;
    match db.get_user(user_id)? {
        Some(user) if user.is_active => Ok(user),
        _ => {
            tracing::warn!(user_id, "request from unknown or inactive user");
            Err(ServiceError::Unauthorized)
        }
    }
}

/// Employees may only touch rows assigned to them.
fn ensure_owner(actor: &User, assigned_to: &str, what: &str) -> ServiceResult<()> {
    if actor.is_admin() || actor.id == assigned_to {
        Ok(())
    } else {
        tracing::warn!(user_id = %actor.id, what, "ownership check failed");
        Err(ServiceError::Forbidden(format!("you do not have access to this {}", what)))
    }
}

fn ensure_admin(actor: &User, operation: &str) -> ServiceResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %actor.id, operation, "admin-only operation denied");
        Err(ServiceError::Forbidden(format!("only admins can {}", operation)))
    }
}

/// The target of an assignment must be an existing, active user.
fn ensure_assignable(db: &Database, user_id: &str) -> ServiceResult<User> {
    match db.get_user(user_id)? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(ValidationErrors::single("assignedTo", "assignee must be an active user").into()),
    }
}
