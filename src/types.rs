//! Core data types for the report pipeline
//!
//! Everything here is created fresh per report generation and held only for
//! the duration of one run; nothing persists across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from language name to byte count for one repository
///
/// May be empty (repository with no detected source) but is never absent on
/// a successful fetch. A `BTreeMap` keeps JSON output deterministic.
pub type LanguageBreakdown = BTreeMap<String, u64>;

/// One repository as returned by the organization listing endpoint
///
/// The `id` is the stable identity key used to join listing results with
/// language-fetch outcomes; it never depends on list position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Stable repository identifier
    pub id: u64,

    /// Full name in `owner/repo` form
    pub full_name: String,

    /// Repository name without the owner prefix
    pub name: String,

    /// Repository owner
    pub owner: RepositoryOwner,

    /// URL of the repository's language-breakdown endpoint
    pub languages_url: String,
}

/// Owner of a repository
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    /// Owner login name
    pub login: String,
}

/// Record of a language fetch that failed after exhausting its retry budget
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchFailure {
    /// Human-readable cause of the final failure
    pub cause: String,

    /// Total attempts made, including the initial try
    pub attempts: u32,
}

/// Tagged per-repository fetch result
///
/// Failures are carried, never silently dropped: a failed fetch becomes a
/// partial report entry rather than a missing one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The language breakdown was fetched successfully
    Success(LanguageBreakdown),

    /// The fetch failed after retries (or was cancelled)
    Failure(FetchFailure),
}

/// Completion status of one report entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// The language breakdown was fetched successfully
    Complete,

    /// The language fetch failed; the entry carries no language data
    Partial,
}

/// Byte count for one language, as it appears on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSize {
    /// Number of source bytes written in the language
    pub bytes: u64,
}

/// One repository's row in the aggregated report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Full name in `owner/repo` form
    pub fullname: String,

    /// Owner login name
    pub owner: String,

    /// Repository name without the owner prefix
    pub repository: String,

    /// Language byte counts; at most one key when a language filter is set,
    /// empty for partial entries
    pub languages: BTreeMap<String, CodeSize>,

    /// Whether the language fetch succeeded for this repository
    pub status: EntryStatus,
}

/// The consolidated report: one entry per listed repository
///
/// Entries appear in the order the listing returned them, regardless of the
/// completion order of the concurrent language fetches. The entry count
/// always equals the listing count; partial failures produce a partial
/// entry, never a missing one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedReport {
    /// Ordered report entries
    pub repositories: Vec<ReportEntry>,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_summary_deserializes_from_listing_json() {
        // Trimmed-down shape of one element of GET /orgs/{org}/repos
        let json = r#"{
            "id": 1296269,
            "node_id": "MDEwOlJlcG9zaXRvcnkxMjk2MjY5",
            "full_name": "octocat/Hello-World",
            "name": "Hello-World",
            "owner": { "login": "octocat", "id": 1 },
            "languages_url": "https://api.github.com/repos/octocat/Hello-World/languages",
            "private": false
        }"#;

        let repo: RepositorySummary = serde_json::from_str(json).unwrap();
        assert_eq!(repo.id, 1296269);
        assert_eq!(repo.full_name, "octocat/Hello-World");
        assert_eq!(repo.name, "Hello-World");
        assert_eq!(repo.owner.login, "octocat");
        assert!(repo.languages_url.ends_with("/languages"));
    }

    #[test]
    fn entry_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&EntryStatus::Complete).unwrap(),
            "\"complete\""
        );
        assert_eq!(
            serde_json::to_string(&EntryStatus::Partial).unwrap(),
            "\"partial\""
        );
    }

    #[test]
    fn report_entry_matches_wire_format() {
        let entry = ReportEntry {
            fullname: "octocat/Hello-World".to_string(),
            owner: "octocat".to_string(),
            repository: "Hello-World".to_string(),
            languages: BTreeMap::from([("Go".to_string(), CodeSize { bytes: 100 })]),
            status: EntryStatus::Complete,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "fullname": "octocat/Hello-World",
                "owner": "octocat",
                "repository": "Hello-World",
                "languages": { "Go": { "bytes": 100 } },
                "status": "complete"
            })
        );
    }

    #[test]
    fn empty_breakdown_is_a_valid_value() {
        let breakdown = LanguageBreakdown::new();
        let outcome = FetchOutcome::Success(breakdown);
        assert!(matches!(outcome, FetchOutcome::Success(ref b) if b.is_empty()));
    }
}
