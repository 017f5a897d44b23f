//! Route handlers: health check and report generation.

use crate::api::AppState;
use crate::error::Result;
use crate::types::AggregatedReport;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

/// Query parameters accepted by `GET /report`
#[derive(Debug, Deserialize)]
pub struct ReportParams {
    /// Per-request language filter, overriding the configured one
    pub language: Option<String>,
}

/// GET /ping - Health check
pub async fn ping() -> impl IntoResponse {
    Json(json!({ "status": "pong" }))
}

/// GET /report - Generate and return the organization language report
///
/// Runs the full pipeline on every call (no caching across runs). The
/// optional `language` query parameter overrides the configured
/// selected-language filter for this request.
pub async fn report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<Json<AggregatedReport>> {
    let report = match params.language.as_deref() {
        Some(language) => state.generator.generate_with_filter(Some(language)).await?,
        None => state.generator.generate().await?,
    };
    Ok(Json(report))
}
