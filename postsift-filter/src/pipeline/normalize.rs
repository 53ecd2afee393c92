//! Text normalisation for duplicate detection.
//!
//! Reduces a post body to the part that carries its content so that
//! reposts differing only in links, mentions, cashtags, spacing or case
//! compare as equal. The key is only used for membership tests and is
//! never written out.

use std::sync::OnceLock;

use regex::Regex;

/// `http://` or `https://` followed by anything up to the next whitespace.
fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://\S+").expect("valid regex"))
}

/// `@handle` mentions.
fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@\w+").expect("valid regex"))
}

/// `$TICKER` cashtags.
fn ticker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\w+").expect("valid regex"))
}

/// Normalise a post body into its deduplication key.
///
/// Applies, in order:
///
/// 1. Strip URLs (`https?://…` up to whitespace).
/// 2. Strip `@mention` tokens.
/// 3. Strip `$TICKER` tokens.
/// 4. Collapse whitespace runs to single spaces and trim.
/// 5. Lower-case.
///
/// An empty result means the text carried no distinguishing content.
///
/// # Examples
///
/// ```
/// use postsift_filter::pipeline::normalize::normalize_key;
///
/// let a = normalize_key("@alice New  RCE in $FOO bridge https://t.co/abc");
/// let b = normalize_key("new rce in bridge");
/// assert_eq!(a, b);
/// ```
pub fn normalize_key(text: &str) -> String {
    let text = url_pattern().replace_all(text, "");
    let text = mention_pattern().replace_all(&text, "");
    let text = ticker_pattern().replace_all(&text, "");
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
