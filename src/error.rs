//! Error types for repolangs
//!
//! This module provides error handling for the crate, including:
//! - The top-level [`Error`] type for report generation and service startup
//! - The per-request [`FetchError`] type used below the aggregator boundary
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for repolangs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for repolangs
///
/// Per-repository language-fetch failures are *not* represented here: they
/// are caught at the fetcher boundary, recorded as partial report entries,
/// and never unwind past the aggregator. This type covers the failures that
/// make a whole report generation (or the process, for `Config`) fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "GITHUB_ORG")
        key: Option<String>,
    },

    /// The repository listing could not be obtained
    ///
    /// A partial repository list is not meaningful to callers, so a failure
    /// on any page aborts the whole listing.
    #[error("repository listing failed: {0}")]
    Listing(#[source] FetchError),

    /// Internal invariant violation (count/identity mismatch between the
    /// repository list and the fetch outcomes)
    #[error("report integrity violation: {0}")]
    Integrity(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),
}

/// Error for a single GitHub API request
///
/// Used by both the repository lister and the language fetcher. For the
/// lister it is promoted to [`Error::Listing`]; for the language fetcher it
/// is converted to a partial-entry failure record instead of propagating.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (connect, timeout, protocol)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status from the GitHub API
    #[error("unexpected HTTP status {status}")]
    Status {
        /// The HTTP status code returned by the API
        status: u16,
        /// Server-provided wait hint from a `Retry-After` header, if any
        retry_after: Option<Duration>,
    },

    /// The response body could not be decoded into the expected shape
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// The fetch was cancelled before completing (deadline or shutdown)
    #[error("fetch cancelled")]
    Cancelled,
}

/// API error response format
///
/// Returned by API endpoints when an error occurs, with a machine-readable
/// error code, a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "listing_error",
///     "message": "repository listing failed: unexpected HTTP status 502"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "listing_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        match &error {
            Error::Config { key: Some(key), .. } => {
                Self::with_details(code, message, serde_json::json!({ "key": key }))
            }
            _ => Self::new(code, message),
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,

            // 502 Bad Gateway - the upstream API failed us
            Error::Listing(_) => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Integrity(_) => 500,
            Error::Serialization(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServer(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Listing(_) => "listing_error",
            Error::Integrity(_) => "integrity_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::ApiServer(_) => "api_server_error",
        }
    }
}
