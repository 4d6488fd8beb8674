//! Lookup error types

use std::time::Duration;
use thiserror::Error;

use crate::queue::QueueError;

/// Per-key failure delivered to a caller's `on_error`
///
/// Cloneable because one failed chunk fans the same error out to every
/// waiting caller and into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Issue not found: {key}")]
    NotFound { key: String },

    #[error("{message}")]
    Transport { message: String },

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("{0}")]
    ConfigurationGap(String),

    #[error("Invalid issue key: {key:?}")]
    InvalidKey { key: String },

    #[error("Request was cancelled before dispatch")]
    Cancelled,

    #[error("Batch coordinator is not running")]
    Closed,
}

/// Coarse classification of a [`LookupError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The lookup succeeded but did not return the key
    NotFound,
    /// The lookup call itself failed (network, auth, rate limit, bad query)
    Transport,
    /// A required account or setting is missing
    ConfigurationGap,
    /// The coordinator never dispatched the request
    Rejected,
}

impl LookupError {
    pub fn not_found(key: impl Into<String>) -> Self {
        LookupError::NotFound { key: key.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        LookupError::Transport {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::NotFound { .. } => ErrorKind::NotFound,
            LookupError::Transport { .. } | LookupError::RateLimited { .. } => ErrorKind::Transport,
            LookupError::ConfigurationGap(_) => ErrorKind::ConfigurationGap,
            LookupError::InvalidKey { .. } | LookupError::Cancelled | LookupError::Closed => ErrorKind::Rejected,
        }
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LookupError::RateLimited { .. })
    }

    /// Check if repeating the same lookup later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::RateLimited { .. } | LookupError::Transport { .. } => true,
            LookupError::NotFound { .. }
            | LookupError::ConfigurationGap(_)
            | LookupError::InvalidKey { .. }
            | LookupError::Cancelled
            | LookupError::Closed => false,
        }
    }

    /// Server-provided wait, if this is a rate limit error that carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LookupError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<QueueError> for LookupError {
    fn from(err: QueueError) -> Self {
        LookupError::transport(err.to_string())
    }
}
