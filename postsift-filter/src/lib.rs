//! # postsift-filter
//!
//! Turns an unordered batch of acquired posts into a deduplicated,
//! relevance-ranked sequence.
//!
//! ## Design
//!
//! - Duplicate detection on normalised text (links, mentions and cashtags
//!   stripped), first-seen wins, scoped to one pass
//! - Transparent integer scoring from keyword weight tables plus a few
//!   structural adjustments; every contribution can be inspected
//! - Disqualifying phrases override everything else
//! - Pure and synchronous: no I/O, no clocks, no global state. The weight
//!   tables live in an explicit [`FilterConfig`] value

pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use config::{DEFAULT_MIN_SCORE, DISQUALIFIED_SCORE, FilterConfig};
pub use error::{FilterError, Result};
pub use pipeline::rank::FilterReport;
pub use pipeline::scoring::{ScoreBreakdown, explain, score_text};
pub use types::{RawRecord, ScoredRecord};

/// Filter a batch of records.
///
/// Validates `config`, then deduplicates, scores, thresholds and sorts
/// `records` (see [`pipeline::rank::rank_records`]). An empty batch yields
/// an empty report.
///
/// # Errors
///
/// Returns [`FilterError::Config`] if `config` is invalid.
///
/// # Examples
///
/// ```
/// use postsift_filter::{FilterConfig, RawRecord};
///
/// let records = vec![
///     RawRecord::new("1", "Critical RCE in bridge contract, PoC on github"),
///     RawRecord::new("2", "wen moon? 1000x soon"),
/// ];
/// let report = postsift_filter::filter(records, &FilterConfig::default())?;
/// assert_eq!(report.kept.len(), 1);
/// assert_eq!(report.kept[0].record.id, "1");
/// # Ok::<(), postsift_filter::FilterError>(())
/// ```
pub fn filter<I>(records: I, config: &FilterConfig) -> Result<FilterReport>
where
    I: IntoIterator<Item = RawRecord>,
{
    config.validate()?;
    Ok(pipeline::rank::rank_records(records, config))
}
