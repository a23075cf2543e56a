// src/error.rs

//! Unified error handling for the aggregation engine.

use std::fmt;

use thiserror::Error;

use crate::models::Source;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for the uniform source-client channel.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failure of one fetch attempt against one upstream source.
///
/// Every variant carries the source it was fetching for and a human-readable
/// cause. Source clients never surface anything else: callers reduce all four
/// kinds to "source unavailable" plus a log line.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport, DNS or TLS failure
    #[error("network error for {src}: {message}")]
    Network { src: Source, message: String },

    /// Response bytes not decodable under any attempted encoding
    #[error("decode error for {src}: {message}")]
    Decode { src: Source, message: String },

    /// Decoded fine, but no pattern or field yielded a plausible price
    #[error("extraction miss for {src}: {message}")]
    ExtractionMiss { src: Source, message: String },

    /// Brand keyword unresolved against the directory, even after a refresh
    #[error("routing error for {src}: {message}")]
    Routing { src: Source, message: String },
}

impl FetchError {
    /// The source this fetch was for.
    ///
    /// The field is deliberately not named `source`: thiserror would treat
    /// it as the error's cause, and a provider identity is not an error.
    pub fn source(&self) -> Source {
        match self {
            Self::Network { src, .. }
            | Self::Decode { src, .. }
            | Self::ExtractionMiss { src, .. }
            | Self::Routing { src, .. } => *src,
        }
    }

    /// Create a network error.
    pub fn network(source: Source, message: impl fmt::Display) -> Self {
        Self::Network {
            src: source,
            message: message.to_string(),
        }
    }

    /// Create a decode error.
    pub fn decode(source: Source, message: impl fmt::Display) -> Self {
        Self::Decode {
            src: source,
            message: message.to_string(),
        }
    }

    /// Create an extraction miss.
    pub fn miss(source: Source, message: impl fmt::Display) -> Self {
        Self::ExtractionMiss {
            src: source,
            message: message.to_string(),
        }
    }

    /// Create a routing error.
    pub fn routing(source: Source, message: impl fmt::Display) -> Self {
        Self::Routing {
            src: source,
            message: message.to_string(),
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Pattern rule failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Response bytes not decodable under any attempted encoding
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fetch failure that escaped a client boundary
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl AppError {
    /// Create a pattern compilation error.
    pub fn pattern(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
