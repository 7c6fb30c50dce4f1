//! Sensor Dashboard - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, ServerConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional explicit config file; otherwise sensor-dashboard.* in the working directory
    let config_path = std::env::var_os("SENSOR_DASHBOARD_CONFIG")
        .map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())
        .context("invalid configuration")?;

    init_logging(config.level()?, config.log_format)
        .context("failed to initialize logging")?;

    info!("=== Sensor Dashboard v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Storing readings in {}, serving the {} most recent",
        config.database_url, config.recent_limit
    );

    run_server(config).await
}
