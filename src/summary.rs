//! Hand-off to an external summarizer.
//!
//! The only contract with the summarizer is a single text blob: record
//! bodies in ranked order joined by [`DIGEST_SEPARATOR`].

use std::future::Future;
use std::path::Path;

use postsift_filter::ScoredRecord;

use crate::error::{Result, SiftError};
use crate::sink;

/// Separator placed between record bodies in the digest.
pub const DIGEST_SEPARATOR: &str = "\n\n---\n\n";

const NO_INPUT_TEXT: &str = "No posts were found to summarize.";
const NO_POSTS_TEXT: &str = "No useful posts were found to create a summary.";

/// Join the bodies of `records` in order. `None` when there are none.
pub fn build_digest(records: &[ScoredRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    let bodies: Vec<&str> = records.iter().map(|r| r.record.body()).collect();
    Some(bodies.join(DIGEST_SEPARATOR))
}

/// Turns a digest into prose.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, content: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Returns the digest unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSummarizer;

impl Summarizer for PassthroughSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        Ok(content.to_owned())
    }
}

/// What [`summarize_file`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryStatus {
    /// The summarizer produced text from this many records.
    Summarized { records: usize },
    /// The input file did not exist.
    MissingInput,
    /// The input held no usable records.
    NoPosts,
    /// The summarizer failed; the error text was written instead.
    Failed(String),
}

/// Summarize the filtered records in `input` and write the result to
/// `output`.
///
/// A missing or empty input and a summarizer failure each produce a
/// short explanatory text in `output` rather than an error.
///
/// # Errors
///
/// Returns an error only if `input` exists but cannot be read, or if
/// `output` cannot be written.
pub async fn summarize_file<S: Summarizer>(
    input: &Path,
    output: &Path,
    summarizer: &S,
) -> Result<SummaryStatus> {
    let records = match sink::read_scored(input) {
        Ok((records, _skipped)) => records,
        Err(SiftError::Precondition(reason)) => {
            tracing::warn!(%reason, "nothing to summarize");
            write_text(output, NO_INPUT_TEXT)?;
            return Ok(SummaryStatus::MissingInput);
        }
        Err(e) => return Err(e),
    };

    let Some(digest) = build_digest(&records) else {
        tracing::info!(input = %input.display(), "no posts to summarize");
        write_text(output, NO_POSTS_TEXT)?;
        return Ok(SummaryStatus::NoPosts);
    };

    tracing::info!(records = records.len(), "summarizing filtered posts");
    match summarizer.summarize(&digest).await {
        Ok(text) => {
            write_text(output, &text)?;
            Ok(SummaryStatus::Summarized {
                records: records.len(),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "summarizer failed");
            write_text(
                output,
                &format!("Could not generate summary due to an error: {e}"),
            )?;
            Ok(SummaryStatus::Failed(e.to_string()))
        }
    }
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsift_filter::RawRecord;

    fn scored(id: &str, text: &str, score: i32) -> ScoredRecord {
        ScoredRecord {
            record: RawRecord::new(id, text),
            score,
        }
    }

    #[test]
    fn digest_joins_bodies_in_order() {
        let records = vec![scored("1", "first", 20), scored("2", "second", 10)];
        assert_eq!(
            build_digest(&records).as_deref(),
            Some("first\n\n---\n\nsecond")
        );
    }

    #[test]
    fn digest_uses_long_form_body() {
        let mut record = scored("1", "short…", 20);
        record.record.full_text = Some("the whole thread".into());
        assert_eq!(
            build_digest(&[record]).as_deref(),
            Some("the whole thread")
        );
    }

    #[test]
    fn empty_digest_is_none() {
        assert_eq!(build_digest(&[]), None);
    }
}
