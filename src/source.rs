//! Query capability consumed by the scheduler.
//!
//! The transport that talks to the social network is an external
//! collaborator. The scheduler only sees [`PostSource`]; [`ReplaySource`]
//! is the built-in offline implementation that serves a previously
//! captured JSONL file.

use std::future::Future;
use std::path::Path;

use postsift_filter::RawRecord;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sink;

/// Fragments that mark a transport failure as rate limiting.
const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "too many requests"];

/// Result ordering requested from the search endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Newest first.
    #[default]
    Latest,
    /// Ranked by engagement.
    Top,
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "Latest"),
            Self::Top => write!(f, "Top"),
        }
    }
}

/// Failure reported by a [`PostSource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The remote asked us to slow down. Retried with backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other failure. Reported and skipped.
    #[error("query failed: {0}")]
    Failure(String),
}

impl QueryError {
    /// Map a free-form transport message onto the error taxonomy.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::RateLimited(message)
        } else {
            Self::Failure(message)
        }
    }

    /// Whether this failure should be retried.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// An authenticated, ready-to-use query capability.
///
/// Implementations must not be called concurrently by the scheduler, but
/// they are required to be `Send + Sync` so a harvester can be moved onto
/// a runtime task.
pub trait PostSource: Send + Sync {
    /// Search recent posts matching `term`.
    fn search(
        &self,
        term: &str,
        sort: SortMode,
    ) -> impl Future<Output = std::result::Result<Vec<RawRecord>, QueryError>> + Send;

    /// Fetch recent posts authored by `user_id`.
    fn user_timeline(
        &self,
        user_id: &str,
    ) -> impl Future<Output = std::result::Result<Vec<RawRecord>, QueryError>> + Send;
}

/// Serves records from a captured JSONL file instead of the network.
///
/// Tagged records match when their `keyword_searched` equals the term
/// (case-insensitive). Untagged records match when their body contains
/// the term. The requested sort mode is ignored; file order is kept.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    records: Vec<RawRecord>,
}

impl ReplaySource {
    /// Wrap an in-memory record set.
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Load a capture from disk, skipping malformed lines.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the file does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let (records, skipped) = sink::read_records(path)?;
        tracing::info!(
            path = %path.display(),
            records = records.len(),
            skipped,
            "replay capture loaded"
        );
        Ok(Self::new(records))
    }

    /// Number of records available for replay.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the capture is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matching(&self, term: &str) -> Vec<RawRecord> {
        // Variation may have added words around the keyword, so a tagged
        // record also matches when its tag appears inside the term.
        let term = term.to_lowercase();
        self.records
            .iter()
            .filter(|r| match r.source_keyword.as_deref() {
                Some(tag) if !tag.trim().is_empty() => {
                    contains_words(&term, &tag.to_lowercase())
                }
                _ => r.body().to_lowercase().contains(&term),
            })
            .cloned()
            .collect()
    }
}

/// Whether the words of `needle` appear as a contiguous run in `haystack`.
fn contains_words(haystack: &str, needle: &str) -> bool {
    let haystack: Vec<&str> = haystack.split_whitespace().collect();
    let needle: Vec<&str> = needle.split_whitespace().collect();
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

impl PostSource for ReplaySource {
    async fn search(
        &self,
        term: &str,
        _sort: SortMode,
    ) -> std::result::Result<Vec<RawRecord>, QueryError> {
        Ok(self.matching(term))
    }

    async fn user_timeline(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<RawRecord>, QueryError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.author_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn classify_rate_limit_markers() {
        for msg in [
            "HTTP 429",
            "Rate limit exceeded",
            "Too Many Requests, slow down",
        ] {
            assert!(QueryError::classify(msg).is_rate_limited(), "{msg}");
        }
    }

    #[test]
    fn classify_other_failures() {
        let err = QueryError::classify("connection reset by peer");
        assert_eq!(
            err,
            QueryError::Failure("connection reset by peer".to_string())
        );
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn sort_mode_serde_is_lowercase() {
        let json = serde_json::to_string(&SortMode::Top).unwrap();
        assert_eq!(json, "\"top\"");
        assert_eq!(SortMode::default(), SortMode::Latest);
        assert_eq!(SortMode::Latest.to_string(), "Latest");
    }

    fn capture() -> ReplaySource {
        let mut by_alice = RawRecord::new("3", "unrelated chatter");
        by_alice.author_id = "alice".into();
        ReplaySource::new(vec![
            RawRecord::new("1", "tagged").with_source_keyword("defi"),
            RawRecord::new("2", "Big DeFi news today"),
            by_alice,
        ])
    }

    #[tokio::test]
    async fn replay_matches_tags_and_bodies() {
        let source = capture();
        let hits = source.search("DeFi", SortMode::Latest).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn replay_matches_varied_terms_by_tag() {
        let source = capture();
        let hits = source.search("latest defi", SortMode::Top).await.unwrap();
        assert!(hits.iter().any(|r| r.id == "1"));
    }

    #[tokio::test]
    async fn replay_matches_multi_word_tags_inside_varied_terms() {
        let source = ReplaySource::new(vec![
            RawRecord::new("1", "tagged").with_source_keyword("smart contract"),
            RawRecord::new("2", "other").with_source_keyword("contract"),
        ]);
        let hits = source
            .search("smart contract news", SortMode::Latest)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let hits = source.search("smartcontract", SortMode::Latest).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn contains_words_respects_word_boundaries() {
        assert!(contains_words("latest smart contract", "smart contract"));
        assert!(!contains_words("smart contracts", "smart contract"));
        assert!(!contains_words("contract smart", "smart contract"));
        assert!(!contains_words("anything", "  "));
    }

    #[tokio::test]
    async fn replay_user_timeline_filters_by_author() {
        let source = capture();
        let hits = source.user_timeline("alice").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");
    }
}
