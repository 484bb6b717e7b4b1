//! Error types shared across the NeuXTP crates

use thiserror::Error;

/// Top-level NeuXTP error type
#[derive(Error, Debug)]
pub enum NxtpError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for NeuXTP operations
pub type NxtpResult<T> = Result<T, NxtpError>;
