//! Keyword-weighted relevance scoring.
//!
//! Assigns an integer score to a post body:
//!
//! - any disqualifying phrase forces `disqualified_score`, nothing else counts
//! - otherwise every useful or noise keyword present (case-insensitive
//!   substring) adds its weight once, however often it appears
//! - structural adjustments: short @-replies and hashtag-stuffed posts are
//!   penalised, posts containing a digit get a small bonus
//!
//! [`explain`] returns every contribution so a score can be audited;
//! [`score_text`] is the total alone.

use crate::config::FilterConfig;

/// A structural adjustment applied after keyword matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Starts with an @-mention and is shorter than the word threshold.
    ShortReply(i32),
    /// More hashtags than the configured limit.
    HashtagStuffing(i32),
    /// Contains at least one digit.
    Digits(i32),
}

impl Adjustment {
    pub fn delta(&self) -> i32 {
        match *self {
            Self::ShortReply(d) | Self::HashtagStuffing(d) | Self::Digits(d) => d,
        }
    }
}

/// Every contribution that made up a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBreakdown {
    /// Final score.
    pub total: i32,
    /// Phrase that disqualified the text, if any. When set, `hits` and
    /// `adjustments` are empty.
    pub disqualified_by: Option<String>,
    /// Matched keywords with their weights, useful table first.
    pub hits: Vec<(String, i32)>,
    pub adjustments: Vec<Adjustment>,
}

impl ScoreBreakdown {
    pub fn is_disqualified(&self) -> bool {
        self.disqualified_by.is_some()
    }
}

/// Score `text` and report how the score was reached.
pub fn explain(text: &str, config: &FilterConfig) -> ScoreBreakdown {
    let lower = text.to_lowercase();

    if let Some(phrase) = config
        .disqualifying_phrases
        .iter()
        .find(|phrase| lower.contains(phrase.as_str()))
    {
        return ScoreBreakdown {
            total: config.disqualified_score,
            disqualified_by: Some(phrase.clone()),
            hits: Vec::new(),
            adjustments: Vec::new(),
        };
    }

    let hits: Vec<(String, i32)> = config
        .useful_keywords
        .iter()
        .chain(config.noise_keywords.iter())
        .filter(|(keyword, _)| lower.contains(keyword.as_str()))
        .map(|(keyword, weight)| (keyword.clone(), *weight))
        .collect();

    let mut adjustments = Vec::new();
    if lower.starts_with('@') && lower.split_whitespace().count() < config.reply_word_threshold {
        adjustments.push(Adjustment::ShortReply(config.reply_penalty.saturating_neg()));
    }
    if lower.matches('#').count() > config.hashtag_limit {
        adjustments.push(Adjustment::HashtagStuffing(config.hashtag_penalty.saturating_neg()));
    }
    if lower.chars().any(|c| c.is_ascii_digit()) {
        adjustments.push(Adjustment::Digits(config.digit_bonus));
    }

    // Weights come from user config; clamp instead of overflowing.
    let total = hits
        .iter()
        .map(|(_, weight)| *weight)
        .chain(adjustments.iter().map(Adjustment::delta))
        .fold(0i32, i32::saturating_add);

    ScoreBreakdown {
        total,
        disqualified_by: None,
        hits,
        adjustments,
    }
}

/// Score `text` under `config`.
pub fn score_text(text: &str, config: &FilterConfig) -> i32 {
    explain(text, config).total
}
