//! Unified error type for the reconciliation engine.

use thiserror::Error;

/// All errors that can abort a reconciliation run.
#[derive(Error, Debug)]
pub enum XrefError {
    /// I/O error (file read/write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (report writing)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input file does not exist
    #[error("Input file does not exist: {0}")]
    InputNotFound(String),

    /// Usage-dump file could not be parsed. Fatal: every classification depends on it.
    #[error("Malformed xref dump '{path}': {source}")]
    MalformedDump {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Metadata export could not be parsed
    #[error("Malformed metadata '{path}': {source}")]
    MalformedMetadata {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid rewrite pattern in the normalizer configuration
    #[error("Invalid rewrite pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Argument validation error
    #[error("{0}")]
    InvalidArgs(String),
}
