//! Side effects that run after a mutation commits.
//!
//! Both recorders log their own failures and never propagate them.

mod audit;
mod notify;

pub use audit::{diff, Actor, AuditEntry, AuditRecorder};
pub use notify::Notifier;
