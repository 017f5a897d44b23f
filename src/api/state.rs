//! Application state for the API server

use crate::config::Config;
use crate::report::ReportGenerator;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones); the generator carries the
/// process-scope HTTP connection pool.
#[derive(Clone)]
pub struct AppState {
    /// The report generator driving the fetch-and-join pipeline
    pub generator: ReportGenerator,

    /// Configuration (read access)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(generator: ReportGenerator, config: Arc<Config>) -> Self {
        Self { generator, config }
    }
}
