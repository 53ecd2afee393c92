//! Record types shared by the filter and the acquisition side.
//!
//! Field names on the wire follow the newline-delimited JSON the scraper
//! has always written, so older capture files stay readable.

use serde::{Deserialize, Deserializer, Serialize};

/// One acquired post, prior to scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Opaque unique id. Numeric ids on the wire are stored as strings.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Short-form body.
    #[serde(default)]
    pub text: String,
    /// Long-form body, preferred over `text` when present and non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    /// Creation timestamp as reported by the network.
    #[serde(default)]
    pub created_at: String,
    #[serde(rename = "user_id", default, deserialize_with = "string_or_number")]
    pub author_id: String,
    #[serde(rename = "user_name", default)]
    pub author_name: String,
    #[serde(rename = "user_screen_name", default)]
    pub author_handle: String,
    #[serde(rename = "retweet_count", default)]
    pub reshare_count: u64,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(rename = "lang", default)]
    pub language_tag: String,
    /// The query term that produced this record.
    #[serde(rename = "keyword_searched", default)]
    pub source_keyword: Option<String>,
}

impl RawRecord {
    /// Build a record with only an id and body; everything else empty.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            full_text: None,
            created_at: String::new(),
            author_id: String::new(),
            author_name: String::new(),
            author_handle: String::new(),
            reshare_count: 0,
            favorite_count: 0,
            language_tag: String::new(),
            source_keyword: None,
        }
    }

    /// Tag the record with the keyword that produced it.
    #[must_use]
    pub fn with_source_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.source_keyword = Some(keyword.into());
        self
    }

    /// The body used for scoring and deduplication.
    ///
    /// Prefers `full_text` when it is present and non-empty.
    pub fn body(&self) -> &str {
        match self.full_text.as_deref() {
            Some(full) if !full.trim().is_empty() => full,
            _ => &self.text,
        }
    }
}

/// A [`RawRecord`] augmented with its integer relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: RawRecord,
    pub score: i32,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
    })
}
