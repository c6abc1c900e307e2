//! Error type definitions for the logo resolver

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// No provider (nor the domain fallback) produced a logo
    #[error("Logo not found: {message}")]
    NotFound { message: String },

    /// Client quota for the current window is consumed
    #[error("Rate limit exceeded: resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Cache or rate-limit backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Store adapter errors, shared by the key-value and blob tiers
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend rejected or failed the operation
    #[error("{backend} backend failed: {message}")]
    Backend { backend: String, message: String },

    /// Stored bytes could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem errors from disk-backed stores
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single provider attempt
///
/// These never abort a resolution; the orchestrator records them on the
/// candidate and only joins them into a message when every provider failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("not an image (content-type: {content_type})")]
    NotAnImage { content_type: String },

    #[error("timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("empty response body")]
    EmptyBody,

    #[error("requires a domain")]
    DomainRequired,
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is a user-visible outcome rather than a fault
    pub fn is_client_outcome(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::NotFound { .. } | Self::RateLimited { .. }
        )
    }
}

impl StorageError {
    /// Create a backend error tagged with the backend name
    pub fn backend<B: Into<String>, M: Into<String>>(backend: B, message: M) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
