//! Duplicate detection by normalised text.
//!
//! First-seen wins: a record is admitted only if its key is non-empty and
//! has not been seen earlier in the same pass. The seen-set lives for one
//! pass and is never persisted.

use std::collections::HashSet;

use super::normalize::normalize_key;

/// Outcome of offering one record to a [`SeenKeys`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First record with this key; it proceeds to scoring.
    Admitted,
    /// Normalised text was empty.
    Empty,
    /// Same key as an earlier record in this pass.
    Duplicate,
}

/// Normalised keys seen during a single filtering pass.
#[derive(Debug, Default)]
pub struct SeenKeys {
    keys: HashSet<String>,
}

impl SeenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a record body. Admitted keys are remembered immediately so
    /// later duplicates in the same pass are rejected.
    pub fn admit(&mut self, body: &str) -> Admission {
        let key = normalize_key(body);
        if key.is_empty() {
            return Admission::Empty;
        }
        if self.keys.insert(key) {
            Admission::Admitted
        } else {
            Admission::Duplicate
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRecord;

    fn record(id: &str, text: &str) -> RawRecord {
        RawRecord::new(id, text)
    }

    /// Admitted records in arrival order.
    fn deduplicate(records: Vec<RawRecord>) -> Vec<RawRecord> {
        let mut seen = SeenKeys::new();
        records
            .into_iter()
            .filter(|record| seen.admit(record.body()) == Admission::Admitted)
            .collect()
    }

    #[test]
    fn unique_texts_pass_through() {
        let out = deduplicate(vec![record("1", "alpha"), record("2", "beta")]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn first_seen_wins() {
        let out = deduplicate(vec![
            record("1", "Bridge exploit drained funds"),
            record("2", "bridge   EXPLOIT drained funds"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "1");
    }

    #[test]
    fn links_and_mentions_do_not_distinguish() {
        let out = deduplicate(vec![
            record("1", "@alice audit report is out https://a.io/1"),
            record("2", "@bob audit report is out https://b.io/2"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "1");
    }

    #[test]
    fn empty_key_never_admitted() {
        let mut seen = SeenKeys::new();
        assert_eq!(seen.admit("https://t.co/x"), Admission::Empty);
        assert_eq!(seen.admit("   "), Admission::Empty);
        assert!(seen.is_empty());
    }

    #[test]
    fn duplicate_reported_after_admission() {
        let mut seen = SeenKeys::new();
        assert_eq!(seen.admit("same"), Admission::Admitted);
        assert_eq!(seen.admit("SAME"), Admission::Duplicate);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn full_text_is_the_dedup_body() {
        let mut long = record("1", "truncated…");
        long.full_text = Some("full story about the hack".into());
        let out = deduplicate(vec![long, record("2", "Full story about the hack")]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(deduplicate(vec![]).is_empty());
    }
}
