//! # repolangs
//!
//! Read-only reporting service over the GitHub REST API: for one
//! organization, list the public repositories, fetch each repository's
//! per-language byte breakdown concurrently, and join the two result sets
//! into one consolidated JSON report.
//!
//! ## Design
//!
//! - **Identity-keyed join** - fetch outcomes are matched to repositories by
//!   id, never by completion order or list position
//! - **Partial results over aborts** - a repository whose language fetch
//!   fails after retries becomes a `partial` entry; only a failed listing
//!   aborts a report generation, and nothing short of a startup
//!   configuration error terminates the process
//! - **Bounded fan-out** - language fetches run under a semaphore with an
//!   optional stage deadline and cancellation
//!
//! ## Quick Start
//!
//! ```no_run
//! use repolangs::{Config, ReportGenerator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("scalingo");
//!     config.selected_language = Some("Go".to_string());
//!
//!     let generator = ReportGenerator::new(config)?;
//!     let report = generator.generate().await?;
//!
//!     for entry in &report.repositories {
//!         println!("{}: {:?}", entry.fullname, entry.languages);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// GitHub REST API client
pub mod github;
/// Report generation pipeline
pub mod report;
/// Retry logic with exponential backoff
pub mod retry;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use config::{Config, GithubConfig, RetryConfig, ServerConfig};
pub use error::{ApiError, Error, ErrorDetail, FetchError, Result, ToHttpStatus};
pub use github::GithubClient;
pub use report::{aggregate, deserialize_report, serialize_report, ReportGenerator};
pub use types::{
    AggregatedReport, CodeSize, EntryStatus, FetchFailure, FetchOutcome, LanguageBreakdown,
    ReportEntry, RepositoryOwner, RepositorySummary,
};

/// Wait for a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Used by the API server for graceful shutdown.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Wait for a termination signal (Ctrl+C on non-Unix platforms).
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
