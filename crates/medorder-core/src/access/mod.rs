//! Access control: permission checks and per-client rate limiting.

mod permissions;
mod rate_limit;

pub use permissions::{actions, modules, PermissionChecker};
pub use rate_limit::{InMemoryRateLimitStore, RateLimitStore, RateLimiter, SweepTask};
