//! Common error types for the PICU tools

use thiserror::Error;

/// Common result type for PICU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the PICU crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Value could not be parsed into the expected form
    #[error("Parse error: {0}")]
    Parse(String),
}
