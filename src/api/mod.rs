//! REST API server module
//!
//! Exposes the service boundary of the report pipeline: a health endpoint
//! and a report endpoint that triggers one full generation per request.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::report::ReportGenerator;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `GET /ping` - Health check
/// - `GET /report` - Generate the organization language report
///   (`?language=<name>` overrides the configured filter)
pub fn create_router(generator: ReportGenerator, config: Arc<Config>) -> Router {
    let state = AppState::new(generator, config);
    let cors_enabled = state.config.server.cors_enabled;

    let router = Router::new()
        .route("/ping", get(routes::ping))
        .route("/report", get(routes::report))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Start the API server on the configured bind address
///
/// Binds a TCP listener, serves the router, and runs until a termination
/// signal arrives. Report-generation failures surface as 5xx responses and
/// never stop the server.
///
/// # Errors
///
/// Returns [`Error::Io`] if the listener cannot bind and
/// [`Error::ApiServer`] if serving fails.
pub async fn start_api_server(generator: ReportGenerator, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.bind_address;

    let app = create_router(generator, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await
        .map_err(|e| Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
