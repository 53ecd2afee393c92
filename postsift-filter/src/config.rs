//! Filter configuration with the hand-tuned default tables.
//!
//! [`FilterConfig`] is an explicit, immutable value handed to every
//! filtering pass. Nothing in this crate reads ambient state, so several
//! configurations can be run side by side over the same batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Default minimum score a record needs to be kept.
pub const DEFAULT_MIN_SCORE: i32 = 6;

/// Score forced onto any record containing a disqualifying phrase.
pub const DISQUALIFIED_SCORE: i32 = -100;

/// Security and developer signal. Severity terms outweigh context terms.
const USEFUL_KEYWORDS: &[(&str, i32)] = &[
    // security intel
    ("vulnerability", 15),
    ("exploit", 15),
    ("0-day", 15),
    ("rce", 12),
    ("security audit", 12),
    ("post-mortem", 10),
    ("threat actor", 8),
    ("malware", 8),
    ("phishing campaign", 8),
    ("responsible disclosure", 7),
    ("poc", 8),
    // bounties and contests
    ("bug bounty", 12),
    ("ctf contest", 10),
    ("security contest", 10),
    ("hackerone", 8),
    // regulation and adoption
    ("regulation", 6),
    ("adoption", 6),
    ("partnership", 5),
    ("integrates", 5),
    ("institutional", 4),
    ("security advisory", 10),
    // technical and development
    ("github", 6),
    ("open source", 5),
    ("devtool", 6),
    ("sdk", 5),
    ("technical deep dive", 8),
    ("whitepaper", 6),
    ("research paper", 7),
    ("hardhat", 5),
    ("foundry", 5),
    // context, low weight
    ("ethereum", 2),
    ("solana", 2),
    ("bitcoin", 1),
    ("blockchain", 1),
    ("web3", 1),
    ("smart contract", 3),
    ("protocol", 3),
    ("mainnet", 2),
    ("testnet", 1),
    ("governance attack", 9),
    ("oracle manipulation", 9),
    ("bridge exploit", 9),
    ("zero-knowledge", 5),
    ("noir-lang", 3),
    ("zk-proofs", 3),
];

/// Trading, price talk and promotional spam.
const NOISE_KEYWORDS: &[(&str, i32)] = &[
    ("price target", -15),
    ("long", -10),
    ("short", -10),
    ("trading signal", -15),
    ("bullish", -10),
    ("bearish", -10),
    ("rsi", -10),
    ("moving average", -10),
    ("chart", -8),
    ("undervalued", -8),
    ("1000x", -10),
    ("pump", -8),
    ("dump", -8),
    ("dip", -6),
    ("ath", -6),
    ("moon", -10),
    ("airdrop", -10),
    ("giveaway", -10),
    ("tag friends", -8),
    ("retweet to win", -8),
    ("gleam", -10),
    ("whitelist", -5),
    ("presale", -5),
    ("shill", -6),
    ("lfg", -10),
    ("killing it", -6),
    ("solid project", -6),
];

/// Recovery-scam and faucet-spam phrasing that is never signal.
const DISQUALIFYING_PHRASES: &[&str] = &[
    "dm now for",
    "dm for recovery",
    "for reliable recovery",
    "contact for recovery",
    "lost funds on",
    "fast & trusted recovery",
    "claimed some sepolia eth",
];

/// Configuration for one relevance filtering pass.
///
/// Use [`Default::default()`] for the stock tables, or override any field.
/// Keyword keys are matched as lower-case substrings; use [`validate`](Self::validate)
/// after building a custom value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Keyword → positive weight.
    pub useful_keywords: BTreeMap<String, i32>,
    /// Keyword → negative weight.
    pub noise_keywords: BTreeMap<String, i32>,
    /// Phrases that force [`disqualified_score`](Self::disqualified_score).
    pub disqualifying_phrases: Vec<String>,
    /// Records scoring below this are dropped.
    pub min_score: i32,
    /// Sentinel score for disqualified records.
    pub disqualified_score: i32,
    /// Penalty for short replies (text starting with an @-mention).
    pub reply_penalty: i32,
    /// A reply with fewer words than this is considered "short".
    pub reply_word_threshold: usize,
    /// Penalty applied when the hashtag count exceeds `hashtag_limit`.
    pub hashtag_penalty: i32,
    /// Maximum hashtags before the stuffing penalty applies.
    pub hashtag_limit: usize,
    /// Bonus for text containing any digit.
    pub digit_bonus: i32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            useful_keywords: to_table(USEFUL_KEYWORDS),
            noise_keywords: to_table(NOISE_KEYWORDS),
            disqualifying_phrases: DISQUALIFYING_PHRASES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            min_score: DEFAULT_MIN_SCORE,
            disqualified_score: DISQUALIFIED_SCORE,
            reply_penalty: 5,
            reply_word_threshold: 8,
            hashtag_penalty: 7,
            hashtag_limit: 6,
            digit_bonus: 1,
        }
    }
}

impl FilterConfig {
    /// Returns a copy of this config with a different threshold.
    #[must_use]
    pub fn with_min_score(mut self, min_score: i32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - every useful weight is positive and every noise weight negative
    /// - no keyword or phrase is empty or contains upper-case characters
    /// - `min_score` is strictly above `disqualified_score`
    /// - penalties and bonus are non-negative
    pub fn validate(&self) -> Result<(), FilterError> {
        for (keyword, weight) in &self.useful_keywords {
            check_term(keyword, "useful keyword")?;
            if *weight <= 0 {
                return Err(FilterError::Config(format!(
                    "useful keyword '{keyword}' must have a positive weight, got {weight}"
                )));
            }
        }
        for (keyword, weight) in &self.noise_keywords {
            check_term(keyword, "noise keyword")?;
            if *weight >= 0 {
                return Err(FilterError::Config(format!(
                    "noise keyword '{keyword}' must have a negative weight, got {weight}"
                )));
            }
        }
        for phrase in &self.disqualifying_phrases {
            check_term(phrase, "disqualifying phrase")?;
        }
        if self.min_score <= self.disqualified_score {
            return Err(FilterError::Config(format!(
                "min_score ({}) must be greater than disqualified_score ({})",
                self.min_score, self.disqualified_score
            )));
        }
        if self.reply_penalty < 0 || self.hashtag_penalty < 0 || self.digit_bonus < 0 {
            return Err(FilterError::Config(
                "penalties and digit_bonus must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

fn to_table(entries: &[(&str, i32)]) -> BTreeMap<String, i32> {
    entries
        .iter()
        .map(|(keyword, weight)| ((*keyword).to_owned(), *weight))
        .collect()
}

fn check_term(term: &str, what: &str) -> Result<(), FilterError> {
    if term.trim().is_empty() {
        return Err(FilterError::Config(format!("{what} must not be empty")));
    }
    if term.chars().any(char::is_uppercase) {
        return Err(FilterError::Config(format!(
            "{what} '{term}' must be lower-case"
        )));
    }
    Ok(())
}
