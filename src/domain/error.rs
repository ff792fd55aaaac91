//! Domain-level errors (no I/O dependencies)

use thiserror::Error;

/// Domain errors represent catalog and emission failures.
///
/// Tree edits and parsing never fail: they degrade to an unchanged or empty document.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("schema registry already installed")]
    RegistryAlreadyInstalled,

    #[error("yaml emission failed: {0}")]
    Emit(#[from] serde_yaml::Error),

    #[error("unknown document shape: {0}")]
    UnknownShape(String),
}

/// Result type for domain operations that can fail.
pub type DomainResult<T> = Result<T, DomainError>;
