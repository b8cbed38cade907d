//! Error types for picu-loader
//!
//! Each variant is either fatal to the run (nothing is persisted) or recovered
//! locally by the ingestion driver, see [`LoaderError::is_fatal`].

use crate::services::file_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Loader error type
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Required property or reference file missing/unreadable
    #[error("Configuration error in '{property}': {reason}")]
    Configuration { property: String, reason: String },

    /// Channel code has no catalog entry, even after the wildcard retry
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// Observation value is not numeric
    #[error("Non-numeric value '{value}' for channel {channel}")]
    InvalidMeasurement { channel: String, value: String },

    /// Required fields of one message unit cannot be parsed
    #[error("Malformed message unit #{index} in {}: {reason}", path.display())]
    MalformedMessageUnit {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    /// Time-series sink rejected a point or could not be reached
    #[error("Time-series sink unavailable at {url}: {reason}")]
    SinkUnavailable { url: String, reason: String },

    /// Final registry or ledger write failed
    #[error("Persistence error for {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    /// A worklist file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reconciliation walk failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// picu-common error
    #[error("Common error: {0}")]
    Common(#[from] picu_common::Error),
}

impl LoaderError {
    /// Shorthand for a configuration error naming the offending property
    pub fn config(property: &str, reason: impl Into<String>) -> Self {
        LoaderError::Configuration {
            property: property.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error aborts the run
    ///
    /// Only per-observation and per-unit failures are recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            LoaderError::UnknownChannel(_)
                | LoaderError::InvalidMeasurement { .. }
                | LoaderError::MalformedMessageUnit { .. }
        )
    }
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;
