//! Unified error handling for the alert server.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for capstan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Wire document could not be decoded.
    #[error("malformed document: {0}")]
    Decode(#[from] quick_xml::DeError),

    /// Document could not be serialized.
    #[error("document serialization failed: {0}")]
    Encode(#[from] quick_xml::SeError),

    /// Timestamp string does not match the canonical wire format.
    #[error("malformed timestamp {value:?}: {source}")]
    MalformedTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    /// A stored document is absent.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Upload exceeds the configured maximum size.
    #[error("payload exceeds maximum upload size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required construction parameter was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Well-formed input that violates a document-level rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
