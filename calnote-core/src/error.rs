//! Error types for calnote.

use thiserror::Error;

/// Errors that can occur in calnote operations.
#[derive(Error, Debug)]
pub enum CalNoteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Another sync pass holds the run lock, try again later")]
    Locked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for calnote operations.
pub type CalNoteResult<T> = Result<T, CalNoteError>;
