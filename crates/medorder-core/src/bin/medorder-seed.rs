//! Initialise a medorder database and create its first admin account.
//!
//! Reads `MEDORDER_*` settings from the environment (and `.env`), plus
//! `MEDORDER_ADMIN_EMAIL`, `MEDORDER_ADMIN_PASSWORD` and optionally
//! `MEDORDER_ADMIN_NAME` for the account itself.

use anyhow::Context;
use medorder_core::{Dashboard, DashboardConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("medorder_core=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DashboardConfig::from_env().context("invalid configuration")?;
    let email = std::env::var("MEDORDER_ADMIN_EMAIL").context("MEDORDER_ADMIN_EMAIL must be set")?;
    let password = std::env::var("MEDORDER_ADMIN_PASSWORD").context("MEDORDER_ADMIN_PASSWORD must be set")?;
    let name = std::env::var("MEDORDER_ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

    let dashboard = Dashboard::open(config).context("failed to open database")?;
    match dashboard
        .bootstrap_admin(&name, &email, &password)
        .context("failed to create admin account")?
    {
        Some(admin) => tracing::info!(email = %admin.email, "admin account created"),
        None => tracing::info!("an active admin already exists, nothing to do"),
    }

    Ok(())
}
