//! Error types for the claimsync library.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::SubmitErrorKind;

/// Main error type for claimsync operations.
///
/// "Not found" outcomes (a subject or asset missing from the store, a date
/// that does not parse) are never represented here. Those travel as
/// `Option`/`Result` values through the normal control flow.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Error reading or writing a local file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Observation contained a field the catalog does not know about.
    #[error("Unknown field '{key}' for subject '{subject}'")]
    UnknownField { subject: String, key: String },

    /// A field value could not be turned into a statement value.
    #[error("Invalid value for field '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Point lookup or asset lookup against the store failed.
    #[error("Lookup failed for '{target}': {message}")]
    Lookup { target: String, message: String },

    /// The store rejected a mutation and the error is not retryable.
    #[error("Submission for '{subject}' rejected ({kind}): {message}")]
    Submission {
        subject: String,
        kind: SubmitErrorKind,
        message: String,
    },

    /// The single credential refresh and retry were used up.
    #[error("Submission for '{subject}' failed after {attempts} attempts ({kind}): {message}")]
    RetryExhausted {
        subject: String,
        attempts: u32,
        kind: SubmitErrorKind,
        message: String,
    },

    /// Could not obtain or refresh an authorization token.
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to publish the duplicate report.
    #[error("Report error: {0}")]
    Report(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the CSV writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SyncError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Submission kind carried by this error, if it came from the store.
    pub fn submit_kind(&self) -> Option<SubmitErrorKind> {
        match self {
            SyncError::Submission { kind, .. } | SyncError::RetryExhausted { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }
}

/// Result type alias for claimsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
