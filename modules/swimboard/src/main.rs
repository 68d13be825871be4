use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use swimboard::{Config, Pipeline, RunOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("swimboard=info".parse()?))
        .init();

    info!("Swimboard watch run starting...");

    // Missing secrets abort here, before any network traffic, with a
    // non-zero exit.
    let config = Config::from_env()?;
    config.log_redacted();

    let pipeline = Arc::new(Pipeline::from_config(&config)?);

    // A failed run has already been reported to the chat; exit cleanly so
    // the scheduler doesn't double-alert.
    match pipeline.run_and_report().await {
        RunOutcome::Completed(report) => info!(?report, "Done"),
        RunOutcome::Failed(reason) => warn!(%reason, "Run failed"),
    }

    Ok(())
}
