//! Unified error handling for the lagoon crate
//!
//! Domain errors ([`FetchError`], [`ExtractError`]) are raised where the
//! failure happens and folded into a single [`Error`] at module boundaries.
//! The immediate caller decides the fate of an error: route-style callers
//! turn it into a failure response, the ingestion pipeline logs it and moves
//! on to the next step.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lagoon::error::{Error, ErrorCategory};
//!
//! fn status_for(err: &Error) -> u16 {
//!     if err.is_not_found() {
//!         404
//!     } else if err.category() == ErrorCategory::Validation {
//!         400
//!     } else {
//!         500
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::{ExtractError, FetchError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, upstream down)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Malformed input to a public operation
    Validation,
    /// Persistence sink errors
    Storage,
    /// Cache store errors
    Cache,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Validation => "validation",
            Self::Storage => "storage",
            Self::Cache => "cache",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the lagoon crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Extraction errors (not found / malformed)
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Malformed input to a public operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Cache layer errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Redis errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Persistence sink errors
    #[error("Sink error: {0}")]
    Sink(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors outside the fetch layer
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Anything without a dedicated variant, e.g. a panicked task
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other(context.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(FetchError::EmptyUrl) => ErrorCategory::Validation,
            Self::Fetch(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Extract(_) | Self::Json(_) => ErrorCategory::Parsing,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Cache(_) | Self::Redis(_) => ErrorCategory::Cache,
            Self::Sink(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Check if this error is worth retrying on a later call
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => !matches!(e, FetchError::EmptyUrl | FetchError::Decode(_)),
            Self::Http(_) | Self::Io(_) | Self::Redis(_) | Self::Cache(_) | Self::Sink(_) => true,
            Self::Extract(_)
            | Self::Json(_)
            | Self::Validation(_)
            | Self::Config(_)
            | Self::Other(_) => false,
        }
    }

    /// Expected markup or structure was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Extract(ExtractError::NotFound(_)))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
