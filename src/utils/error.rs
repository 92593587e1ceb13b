//! Error types for fetching and extraction
//!
//! These are the domain errors raised by the fetch layer and the
//! source-specific extractors. They are wrapped by [`crate::error::Error`]
//! at module boundaries.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// No URL was supplied
    #[error("No URL provided for the GET request")]
    EmptyUrl,

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Both the proxied and the direct attempt failed
    #[error("Upstream unavailable for {url}: proxied attempt failed ({proxied}), direct attempt failed ({direct})")]
    UpstreamUnavailable {
        url: String,
        proxied: String,
        direct: String,
    },
}

impl FetchError {
    /// Classify a reqwest error, keeping timeouts distinct
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(err)
        }
    }
}

/// Errors raised while turning raw markup or JSON into records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Expected markup or structure is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Structure was found but its content could not be parsed
    #[error("Malformed data: {0}")]
    Malformed(String),
}

impl ExtractError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        Self::Malformed(what.into())
    }
}
