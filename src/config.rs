//! Configuration types for postsift.
//!
//! Every section is `#[serde(default)]`, so a missing, empty or partial
//! TOML file all produce a runnable configuration.

use std::path::{Path, PathBuf};

use postsift_filter::FilterConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};
use crate::source::SortMode;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Output file locations.
    pub output: OutputConfig,
    /// What to query and how many times.
    pub acquisition: AcquisitionConfig,
    /// Backoff policy around each query.
    pub retry: RetryConfig,
    /// Human-like session pacing.
    pub session: SessionConfig,
    /// Query-term variation.
    pub variation: VariationConfig,
    /// Relevance filter tables and thresholds.
    pub filter: FilterConfig,
}

impl SiftConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SiftError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SiftError::Config(e.to_string()))
    }

    /// Returns the default config file path: `<config dir>/postsift/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("postsift")
            .join("config.toml")
    }

    /// Check ranges, probabilities and the embedded filter tables.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.acquisition
            .micro_pause_secs
            .check("acquisition.micro_pause_secs")?;

        if self.retry.max_retries == 0 {
            return Err(SiftError::Config("retry.max_retries must be > 0".into()));
        }
        if !self.retry.base_wait_secs.is_finite() || self.retry.base_wait_secs < 0.0 {
            return Err(SiftError::Config(
                "retry.base_wait_secs must be >= 0".into(),
            ));
        }
        self.retry.jitter.check("retry.jitter")?;

        let s = &self.session;
        s.duration_minutes.check("session.duration_minutes")?;
        if s.duration_minutes.max <= 0.0 && self.acquisition.max_sessions.is_none() {
            return Err(SiftError::Config(
                "session.duration_minutes.max must be > 0 unless acquisition.max_sessions is set"
                    .into(),
            ));
        }
        s.long_pause_minutes.check("session.long_pause_minutes")?;
        s.distraction_secs.check("session.distraction_secs")?;
        check_probability(s.distraction_probability, "session.distraction_probability")?;
        for (name, profile) in [
            ("light", &s.light),
            ("moderate", &s.moderate),
            ("active", &s.active),
        ] {
            profile.delay_secs.check(&format!("session.{name}.delay_secs"))?;
            profile.break_secs.check(&format!("session.{name}.break_secs"))?;
            check_probability(
                profile.break_probability,
                &format!("session.{name}.break_probability"),
            )?;
        }

        let v = &self.variation;
        check_probability(v.qualifier_probability, "variation.qualifier_probability")?;
        check_probability(v.suffix_probability, "variation.suffix_probability")?;
        check_probability(v.typo_probability, "variation.typo_probability")?;

        self.filter.validate()?;
        Ok(())
    }
}

/// A closed `[min, max]` interval sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Degenerate span that always samples `value`.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Draw a value uniformly from the span.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    /// Both ends multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.min * factor, self.max * factor)
    }

    fn check(&self, field: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min < 0.0 {
            return Err(SiftError::Config(format!(
                "{field} must be finite and non-negative"
            )));
        }
        if self.min > self.max {
            return Err(SiftError::Config(format!(
                "{field}: min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

fn check_probability(p: f64, field: &str) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SiftError::Config(format!(
            "{field} must be within [0, 1], got {p}"
        )))
    }
}

/// Output file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only raw capture written during acquisition.
    pub raw_path: PathBuf,
    /// Filtered, scored output, rewritten on every filter pass.
    pub filtered_path: PathBuf,
    /// Summarizer output.
    pub summary_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("posts.jsonl"),
            filtered_path: PathBuf::from("filtered_posts.jsonl"),
            summary_path: PathBuf::from("summary.txt"),
        }
    }
}

/// What the acquisition loop queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub keywords: Vec<String>,
    pub sort_mode: SortMode,
    /// Walks over the keyword list. `0` repeats until interrupted.
    pub passes: u32,
    /// Stop after this many sessions have been started.
    pub max_sessions: Option<u32>,
    /// Seed for reproducible pacing. Entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Short pause taken while iterating a result page.
    pub micro_pause_secs: Span,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_owned()).collect(),
            sort_mode: SortMode::Latest,
            passes: 1,
            max_sessions: None,
            seed: None,
            micro_pause_secs: Span::new(0.2, 1.5),
        }
    }
}

const DEFAULT_KEYWORDS: &[&str] = &[
    "bitcoin", "btc", "ethereum", "eth", "defi", "nft", "web3", "blockchain",
    "crypto", "cryptocurrency", "altcoin", "token", "airdrops", "airdrop",
    "rugpull", "ico", "presale", "staking", "yield farming", "smart contract",
    "layer2", "l2", "rollup", "solana", "sol", "cardano", "ada", "polkadot",
    "dot", "ripple", "xrp", "avalanche", "avax", "tron", "trx", "binance",
    "bnb", "coinbase", "rekt", "memecoin", "memes", "opensea", "rarible",
    "metamask", "wallet", "onchain", "on-chain", "zk", "zkrollup", "zk-proof",
    "zero knowledge", "privacy coin", "monero", "xmr", "lido", "liquid staking",
];

/// Backoff policy for rate-limited queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Rate-limited attempts before a query is abandoned.
    pub max_retries: u32,
    /// Wait before the first retry, doubled on each further attempt.
    pub base_wait_secs: f64,
    /// Multiplier applied to every backoff wait.
    pub jitter: Span,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_wait_secs: 15.0,
            jitter: Span::new(0.5, 1.0),
        }
    }
}

/// Delay range, break probability and break length for one activity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Inter-query delay before the time-of-day multiplier is applied.
    pub delay_secs: Span,
    pub break_probability: f64,
    pub break_secs: Span,
}

/// Session pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session length, drawn once per session.
    pub duration_minutes: Span,
    pub light: ProfileConfig,
    pub moderate: ProfileConfig,
    pub active: ProfileConfig,
    /// Chance of an extra "distraction" delay after a query.
    pub distraction_probability: f64,
    pub distraction_secs: Span,
    /// Gap between consecutive sessions.
    pub long_pause_minutes: Span,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: Span::new(30.0, 90.0),
            light: ProfileConfig {
                delay_secs: Span::new(60.0, 150.0),
                break_probability: 0.25,
                break_secs: Span::new(180.0, 600.0),
            },
            moderate: ProfileConfig {
                delay_secs: Span::new(30.0, 100.0),
                break_probability: 0.15,
                break_secs: Span::new(90.0, 300.0),
            },
            active: ProfileConfig {
                delay_secs: Span::new(20.0, 70.0),
                break_probability: 0.10,
                break_secs: Span::new(45.0, 180.0),
            },
            distraction_probability: 0.1,
            distraction_secs: Span::new(20.0, 70.0),
            long_pause_minutes: Span::new(20.0, 60.0),
        }
    }
}

/// Query-term variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariationConfig {
    pub qualifier_probability: f64,
    pub suffix_probability: f64,
    pub typo_probability: f64,
    /// Words that may be prepended to a keyword.
    pub qualifiers: Vec<String>,
    /// Words that may be appended to a keyword.
    pub suffixes: Vec<String>,
}

impl Default for VariationConfig {
    fn default() -> Self {
        Self {
            qualifier_probability: 0.1,
            suffix_probability: 0.1,
            typo_probability: 0.05,
            qualifiers: ["latest", "new", "breaking", "about"]
                .iter()
                .map(|w| (*w).to_owned())
                .collect(),
            suffixes: ["news", "today", "update", "thread", "2024"]
                .iter()
                .map(|w| (*w).to_owned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn default_config_is_valid() {
        SiftConfig::default().validate().unwrap();
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = SiftConfig::default();
        assert_eq!(config.output.raw_path, PathBuf::from("posts.jsonl"));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_wait_secs, 15.0);
        assert_eq!(config.session.duration_minutes, Span::new(30.0, 90.0));
        assert_eq!(config.session.light.break_probability, 0.25);
        assert_eq!(config.filter.min_score, 6);
        assert!(config.acquisition.keywords.contains(&"defi".to_string()));
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config: SiftConfig = toml::from_str("").unwrap();
        assert_eq!(config, SiftConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: SiftConfig = toml::from_str(
            r#"
            [retry]
            max_retries = 5

            [acquisition]
            keywords = ["zk"]
            sort_mode = "top"

            [filter]
            min_score = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_wait_secs, 15.0);
        assert_eq!(config.acquisition.keywords, vec!["zk".to_string()]);
        assert_eq!(config.acquisition.sort_mode, SortMode::Top);
        assert_eq!(config.filter.min_score, 10);
        assert!(!config.filter.useful_keywords.is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = SiftConfig::default();
        config.acquisition.seed = Some(7);
        config.save_to_file(&path).unwrap();
        assert_eq!(SiftConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiftConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, SiftConfig::default());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry\nmax_retries = ").unwrap();
        assert!(matches!(
            SiftConfig::from_file(&path),
            Err(SiftError::Config(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_span() {
        let mut config = SiftConfig::default();
        config.session.duration_minutes = Span::new(90.0, 30.0);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session.duration_minutes"), "{err}");
    }

    #[test]
    fn validate_rejects_bad_probability() {
        let mut config = SiftConfig::default();
        config.session.moderate.break_probability = 1.5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session.moderate.break_probability"), "{err}");
    }

    #[test]
    fn zero_length_sessions_need_a_session_ceiling() {
        let mut config = SiftConfig::default();
        config.session.duration_minutes = Span::fixed(0.0);
        assert!(config.validate().is_err());
        config.acquisition.max_sessions = Some(1);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_retries() {
        let mut config = SiftConfig::default();
        config.retry.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_delegates_to_filter() {
        let mut config = SiftConfig::default();
        config.filter.min_score = -500;
        assert!(matches!(config.validate(), Err(SiftError::Filter(_))));
    }

    #[test]
    fn span_sampling_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let span = Span::new(2.0, 4.0);
        for _ in 0..100 {
            let v = span.sample(&mut rng);
            assert!((2.0..=4.0).contains(&v));
        }
        assert_eq!(Span::fixed(3.0).sample(&mut rng), 3.0);
        assert_eq!(span.scaled(1.5), Span::new(3.0, 6.0));
    }

    #[test]
    fn default_path_ends_with_postsift_config() {
        let path = SiftConfig::default_config_path();
        assert!(path.ends_with("postsift/config.toml"));
    }
}
