//! Error types for detector construction and configuration.

use thiserror::Error;

/// Errors reported while building a detector from configuration.
///
/// These are the only failure surface of the engine: once a
/// [`crate::WindowMatcher`] is constructed, event ingestion cannot fail.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pattern {name:?} has an empty event sequence")]
    EmptyPattern { name: String },

    #[error("time threshold must be positive, got {millis} ms")]
    InvalidThreshold { millis: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
