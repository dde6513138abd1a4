//! SPARQL updater
//!
//! Run with: `cargo run -p sparql-updater-server -- --help`

use clap::{CommandFactory, FromArgMatches};
use sparql_updater_server::{
    config_file::load_and_merge_config,
    execute,
    telemetry::{init_logging, TelemetryConfig},
    UpdaterConfig,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse CLI + env via clap (typed config and raw matches)
    let matches = UpdaterConfig::command().get_matches();
    let mut config = UpdaterConfig::from_arg_matches(&matches)?;

    // 2. Config file values apply only where CLI/env didn't set a value
    if let Err(e) = load_and_merge_config(&mut config, &matches) {
        eprintln!("Warning: {e}");
    }

    let telemetry_config = TelemetryConfig::with_updater_config(&config);
    init_logging(&telemetry_config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?config.mode(),
        log_format = ?telemetry_config.log_format,
        "Starting SPARQL updater"
    );
    config.log_important_settings();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, stopping after the current data set...");
            let _ = shutdown_tx.send(true);
        }
    });

    execute(&config, shutdown_rx).await.map_err(|e| {
        tracing::error!(error = %e, "SPARQL updater stopped with an error");
        e.into()
    })
}
