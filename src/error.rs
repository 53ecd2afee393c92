//! Error types for postsift.

/// Top-level error type for acquisition, filtering and hand-off.
///
/// Recoverable query conditions are not represented here; they are
/// [`QueryError`](crate::source::QueryError) values handled inside the
/// scheduler and never escape a run.
#[derive(Debug, thiserror::Error)]
pub enum SiftError {
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A run cannot start: missing input, no query capability, etc.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Relevance filter rejected its configuration.
    #[error(transparent)]
    Filter(#[from] postsift_filter::FilterError),

    /// Summarizer failure.
    #[error("summary error: {0}")]
    Summary(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SiftError>;
