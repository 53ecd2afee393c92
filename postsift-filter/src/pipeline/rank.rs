//! The filtering pass: dedup → score → threshold → rank.

use crate::config::FilterConfig;
use crate::types::{RawRecord, ScoredRecord};

use super::dedup::{Admission, SeenKeys};
use super::scoring::explain;

/// Outcome of one filtering pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    /// Records offered to the pass.
    pub total_seen: usize,
    /// Records whose normalised text was empty.
    pub empty_dropped: usize,
    /// Records dropped as duplicates of an earlier record.
    pub duplicates_dropped: usize,
    /// Records that hit a disqualifying phrase.
    pub disqualified: usize,
    /// Non-disqualified records scoring under the threshold.
    pub below_threshold: usize,
    /// Surviving records, highest score first; ties keep arrival order.
    pub kept: Vec<ScoredRecord>,
}

impl FilterReport {
    /// The `n` highest-scoring records.
    pub fn top(&self, n: usize) -> &[ScoredRecord] {
        &self.kept[..n.min(self.kept.len())]
    }
}

/// Run one filtering pass over `records` in arrival order.
///
/// # Pipeline
///
/// 1. Drop records with an empty or already-seen normalised key
/// 2. Score the body of each admitted record
/// 3. Keep records with `score >= min_score`
/// 4. Stable sort by score, descending
///
/// The seen-set is created fresh for every call, so the pass is
/// idempotent for identical input and configuration.
pub fn rank_records<I>(records: I, config: &FilterConfig) -> FilterReport
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut seen = SeenKeys::new();
    let mut report = FilterReport::default();

    for record in records {
        report.total_seen += 1;

        match seen.admit(record.body()) {
            Admission::Admitted => {}
            Admission::Empty => {
                report.empty_dropped += 1;
                continue;
            }
            Admission::Duplicate => {
                report.duplicates_dropped += 1;
                continue;
            }
        }

        let breakdown = explain(record.body(), config);
        if let Some(phrase) = &breakdown.disqualified_by {
            tracing::debug!(id = %record.id, phrase = %phrase, "record disqualified");
            report.disqualified += 1;
            continue;
        }
        if breakdown.total < config.min_score {
            report.below_threshold += 1;
            continue;
        }

        report.kept.push(ScoredRecord {
            record,
            score: breakdown.total,
        });
    }

    // `sort_by` is stable, so equal scores keep arrival order.
    report.kept.sort_by(|a, b| b.score.cmp(&a.score));

    tracing::debug!(
        seen = report.total_seen,
        kept = report.kept.len(),
        duplicates = report.duplicates_dropped,
        disqualified = report.disqualified,
        "filter pass complete"
    );

    report
}
