//! GitHub REST API client
//!
//! Read-only client covering the two endpoints the pipeline needs: the
//! organization repository listing (paginated, sequential) and the
//! per-repository language breakdown. All requests go through the shared
//! retry executor; the two callers differ only in how exhausted retries
//! surface (listing aborts, language fetches degrade to partial entries).

use crate::config::{Config, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::retry::fetch_with_retry;
use crate::types::{FetchFailure, FetchOutcome, LanguageBreakdown, RepositorySummary};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use std::time::Duration;

/// Accept header value required by the GitHub REST API
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// API version header required by the GitHub REST API
const GITHUB_API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// API version this client speaks
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Client for the GitHub REST API
///
/// Wraps one `reqwest::Client` (the process-scope connection pool) and is
/// cheap to clone; clones share the pool and are safe to use concurrently.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
    page_size: u32,
    retry: RetryConfig,
}

impl GithubClient {
    /// Create a new client from the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.github.request_timeout)
            .user_agent(config.github.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self {
            http,
            api_base: config.github.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            page_size: config.github.page_size,
            retry: config.retry.clone(),
        })
    }

    /// List all public repositories of an organization, in API order
    ///
    /// Pages through `GET /orgs/{org}/repos` sequentially until a page comes
    /// back shorter than the page size. Order is preserved across pages and
    /// never re-sorted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Listing`] when any page request fails after its
    /// retry budget: a partial repository list is not meaningful to callers.
    pub async fn list_public_repositories(&self, org: &str) -> Result<Vec<RepositorySummary>> {
        let url = format!("{}/orgs/{}/repos", self.api_base, org);
        let mut repositories = Vec::new();

        for page in 1u32.. {
            let query = [
                ("type", "public".to_string()),
                ("per_page", self.page_size.to_string()),
                ("page", page.to_string()),
            ];

            let body = fetch_with_retry(&self.retry, || self.get(&url, &query))
                .await
                .map_err(|(e, _attempts)| Error::Listing(e))?;

            let page_repos: Vec<RepositorySummary> = serde_json::from_slice(&body)
                .map_err(|e| Error::Listing(FetchError::Decode(e.to_string())))?;

            let page_len = page_repos.len();
            repositories.extend(page_repos);

            tracing::debug!(
                org = org,
                page = page,
                page_len = page_len,
                total = repositories.len(),
                "Fetched repository listing page"
            );

            // A short page means the listing is exhausted
            if page_len < self.page_size as usize {
                break;
            }
        }

        tracing::info!(
            org = org,
            repositories = repositories.len(),
            "Listed public repositories"
        );
        Ok(repositories)
    }

    /// Fetch the language byte breakdown for one repository
    ///
    /// An empty response body is a valid empty breakdown. Exhausted retries
    /// are converted to a [`FetchFailure`] outcome here so that one
    /// repository's failure never unwinds past the aggregator.
    pub async fn fetch_languages(&self, languages_url: &str) -> FetchOutcome {
        let result = fetch_with_retry(&self.retry, || async {
            let body = self.get(languages_url, &[]).await?;
            if body.is_empty() {
                return Ok(LanguageBreakdown::new());
            }
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
        })
        .await;

        match result {
            Ok(breakdown) => FetchOutcome::Success(breakdown),
            Err((cause, attempts)) => {
                tracing::warn!(
                    url = languages_url,
                    error = %cause,
                    attempts = attempts,
                    "Language fetch failed"
                );
                FetchOutcome::Failure(FetchFailure {
                    cause: cause.to_string(),
                    attempts,
                })
            }
        }
    }

    /// Issue one GET request with the GitHub API headers and return the body
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let mut request = self
            .http
            .get(url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(GITHUB_API_VERSION_HEADER, GITHUB_API_VERSION);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                retry_after: parse_retry_after(response.headers()),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse a `Retry-After` header given in seconds
///
/// GitHub sends the delay-seconds form on rate-limit responses; the
/// HTTP-date form is not used by the API and is ignored here.
fn parse_retry_after(headers: &HeaderMap<HeaderValue>) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
