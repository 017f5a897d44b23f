//! repolangs service binary
//!
//! Long-lived HTTP service exposing the organization language report.
//! Configuration comes from the environment; a missing or invalid required
//! value is the only error that terminates the process. Failed report
//! generations surface as 5xx responses and the service keeps running.
//!
//! Exit codes:
//!   0 - Clean shutdown on SIGTERM/SIGINT
//!   1 - Startup error (configuration, bind failure)

use repolangs::api::start_api_server;
use repolangs::{Config, ReportGenerator};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Startup failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> repolangs::Result<()> {
    let config = Config::from_env()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        org = %config.organization,
        language = config.selected_language.as_deref().unwrap_or("<all>"),
        "Starting repolangs"
    );

    let config = Arc::new(config);
    let generator = ReportGenerator::new((*config).clone())?;

    start_api_server(generator, config).await
}
