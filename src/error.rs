//! Error types for undbc

use thiserror::Error;

/// Main error type for undbc operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file extension (expected .dbc or .db2): {0}")]
    InvalidExtension(String),

    #[error("Invalid file signature: {0}")]
    InvalidSignature(String),

    #[error("Truncated read: {0}")]
    TruncatedRead(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for undbc operations
pub type Result<T> = std::result::Result<T, Error>;
