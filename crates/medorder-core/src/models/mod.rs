//! Domain models for the medorder system.

mod address;
mod audit;
mod lead;
mod notification;
mod order;
mod page;
mod patch;
mod user;
mod validation;

pub use address::*;
pub use audit::*;
pub use lead::*;
pub use notification::*;
pub use order::*;
pub use page::*;
pub use patch::*;
pub use user::*;
pub use validation::*;

/// Monetary amount in the smallest currency unit.
pub type Amount = i64;
