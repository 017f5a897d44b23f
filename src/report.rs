//! Report generation pipeline
//!
//! Ties the two GitHub calls together: list the organization's public
//! repositories (sequential, paginated), fan out the per-repository language
//! fetches under a bounded concurrency limit, then join the outcomes back to
//! the listing by repository id. The join never depends on completion order;
//! the final report is emitted in listing order.

use crate::config::Config;
use crate::error::{Error, FetchError, Result};
use crate::github::GithubClient;
use crate::types::{
    AggregatedReport, CodeSize, EntryStatus, FetchFailure, FetchOutcome, LanguageBreakdown,
    ReportEntry, RepositorySummary,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Generates aggregated language reports for one organization
///
/// Owns the GitHub client (and with it the process-scope HTTP connection
/// pool). Cheap to clone; safe to share across concurrent report requests.
#[derive(Clone)]
pub struct ReportGenerator {
    client: GithubClient,
    config: Arc<Config>,
}

impl ReportGenerator {
    /// Create a generator from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = GithubClient::new(&config)?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Generate a report using the configured language filter
    ///
    /// # Errors
    ///
    /// Returns [`Error::Listing`] when the repository list cannot be
    /// obtained and [`Error::Integrity`] on a list/outcome mismatch.
    /// Individual language-fetch failures do not error; they yield partial
    /// entries.
    pub async fn generate(&self) -> Result<AggregatedReport> {
        self.generate_with_filter(self.config.selected_language.as_deref())
            .await
    }

    /// Generate a report projected to the given language (or the full
    /// breakdown when `None`)
    ///
    /// # Errors
    ///
    /// Same as [`ReportGenerator::generate`].
    pub async fn generate_with_filter(
        &self,
        selected_language: Option<&str>,
    ) -> Result<AggregatedReport> {
        let repos = self
            .client
            .list_public_repositories(&self.config.organization)
            .await?;

        let outcomes = self.fetch_all_languages(&repos).await;
        let report = aggregate(&repos, outcomes, selected_language)?;

        tracing::info!(
            org = %self.config.organization,
            repositories = report.repositories.len(),
            partial = report
                .repositories
                .iter()
                .filter(|e| e.status == EntryStatus::Partial)
                .count(),
            "Generated language report"
        );
        Ok(report)
    }

    /// Fetch language breakdowns for all repositories concurrently
    ///
    /// Concurrency is bounded by a semaphore sized from the configuration.
    /// One cancellation token covers the whole stage; when the optional
    /// fetch deadline expires, in-flight and unstarted fetches resolve to
    /// failures while already-completed outcomes are kept. Every repository
    /// gets exactly one outcome, keyed by id.
    async fn fetch_all_languages(
        &self,
        repos: &[RepositorySummary],
    ) -> HashMap<u64, FetchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.github.max_concurrent_fetches));
        let cancel = CancellationToken::new();

        // The watchdog is aborted once the stage drains so a generous
        // deadline does not leave a timer running per report request
        let watchdog = self.config.github.fetch_deadline.map(|deadline| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                token.cancel();
            })
        });

        let mut tasks = JoinSet::new();
        for repo in repos {
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let id = repo.id;
            let url = repo.languages_url.clone();

            tasks.spawn(async move {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => None,
                    permit = semaphore.clone().acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return (id, cancelled_outcome());
                };

                tokio::select! {
                    _ = cancel.cancelled() => (id, cancelled_outcome()),
                    outcome = client.fetch_languages(&url) => (id, outcome),
                }
            });
        }

        let mut outcomes = HashMap::with_capacity(repos.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    outcomes.insert(id, outcome);
                }
                Err(e) => {
                    // The repository loses its outcome and the aggregator
                    // reports the integrity violation
                    tracing::error!(error = %e, "Language fetch task failed to join");
                }
            }
        }

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        outcomes
    }
}

/// Outcome assigned to fetches abandoned by cancellation
fn cancelled_outcome() -> FetchOutcome {
    FetchOutcome::Failure(FetchFailure {
        cause: FetchError::Cancelled.to_string(),
        attempts: 0,
    })
}

/// Join repositories with their fetch outcomes into an ordered report
///
/// Pure function. Outcomes are matched by repository id, never by position,
/// so concurrent fetches completing out of order cannot corrupt the report.
/// Entries come out in the order of `repos`.
///
/// # Errors
///
/// Returns [`Error::Integrity`] when a repository has no outcome at all.
/// That is an internal invariant violation, not a remote-API condition, and
/// it fails the report generation rather than dropping the entry.
pub fn aggregate(
    repos: &[RepositorySummary],
    mut outcomes: HashMap<u64, FetchOutcome>,
    selected_language: Option<&str>,
) -> Result<AggregatedReport> {
    let mut repositories = Vec::with_capacity(repos.len());

    for repo in repos {
        let outcome = outcomes.remove(&repo.id).ok_or_else(|| {
            Error::Integrity(format!(
                "no fetch outcome for repository {} ({})",
                repo.id, repo.full_name
            ))
        })?;

        let (languages, status) = match outcome {
            FetchOutcome::Success(breakdown) => (
                project(breakdown, selected_language),
                EntryStatus::Complete,
            ),
            FetchOutcome::Failure(failure) => {
                tracing::debug!(
                    repository = %repo.full_name,
                    cause = %failure.cause,
                    attempts = failure.attempts,
                    "Repository entry is partial"
                );
                (BTreeMap::new(), EntryStatus::Partial)
            }
        };

        repositories.push(ReportEntry {
            fullname: repo.full_name.clone(),
            owner: repo.owner.login.clone(),
            repository: repo.name.clone(),
            languages,
            status,
        });
    }

    Ok(AggregatedReport { repositories })
}

/// Project a breakdown to the selected language, or carry it whole
///
/// A repository that does not use the selected language gets an explicit
/// `bytes: 0` entry, not a missing key.
fn project(
    breakdown: LanguageBreakdown,
    selected_language: Option<&str>,
) -> BTreeMap<String, CodeSize> {
    match selected_language {
        None => breakdown
            .into_iter()
            .map(|(language, bytes)| (language, CodeSize { bytes }))
            .collect(),
        Some(language) => {
            let bytes = breakdown.get(language).copied().unwrap_or(0);
            BTreeMap::from([(language.to_string(), CodeSize { bytes })])
        }
    }
}

/// Encode a report to its JSON wire format
///
/// # Errors
///
/// Returns [`Error::Serialization`] on values outside the serializable
/// domain; this should not occur for well-formed reports.
pub fn serialize_report(report: &AggregatedReport) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(report)?)
}

/// Decode a report from its JSON wire format
///
/// # Errors
///
/// Returns [`Error::Serialization`] when the bytes are not a well-formed
/// report.
pub fn deserialize_report(bytes: &[u8]) -> Result<AggregatedReport> {
    Ok(serde_json::from_slice(bytes)?)
}
