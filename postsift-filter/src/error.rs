//! Error types for the postsift-filter crate.
//!
//! The filter itself is infallible over well-formed input; the only error
//! surface is an invalid [`FilterConfig`](crate::FilterConfig).

/// Errors that can occur while preparing a filtering pass.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Invalid filter configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for postsift-filter results.
pub type Result<T> = std::result::Result<T, FilterError>;
