//! Error types for reference resolution.

use std::time::Duration;

/// Errors that can occur while resolving references.
///
/// Provider-facing variants (`Http`, `Api`, `NotFound`, `RateLimited`, `Parse`,
/// `Json`) are recoverable: the adapters log them and report "no match".
/// `InvalidRateLimit` and `Config` are raised at construction time only.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// HTTP request failed (network, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error status code.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the provider (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Failed to parse a provider response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Rate limiter constructed with a non-positive rate or capacity.
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error (CLI input).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for Results using [`ResolveError`].
pub type Result<T> = std::result::Result<T, ResolveError>;
