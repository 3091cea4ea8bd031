//! GritLeague - Fitness Competition Engine
//!
//! Main entry point: initializes logging, configuration, and the database,
//! then stands the engine services up. Request transport is provided by the
//! surrounding deployment; this binary verifies the installation.

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gritleague::events::LogSink;
use gritleague::{config, Database, VerificationService};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GritLeague v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config().context("failed to load configuration")?;
    let db_path = config.data_dir.join(&config.database.filename);

    let db = Arc::new(Database::open(&db_path).context("failed to open database")?);

    let _verification = VerificationService::new(Arc::clone(&db)).with_events(Arc::new(LogSink));

    tracing::info!("Engine ready (database: {})", db_path.display());

    Ok(())
}
