//! HTTP error response handling for the API
//!
//! Converts domain errors to HTTP responses with appropriate status codes
//! and JSON error bodies. A failed report generation becomes a 5xx response;
//! it never terminates the hosting process.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}
