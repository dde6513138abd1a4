//! Error types for the dataset source

use thiserror::Error;

/// Errors from listing or fetching dataset archives
#[derive(Debug, Error)]
pub enum SourceError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The mirror has no archive for the dataset
    #[error("No archive found for dataset {0}")]
    NotFound(String),

    /// Copying the archive kept failing
    #[error("Failed to download dataset {id} after {attempts} attempts: {reason}")]
    FetchFailed {
        id: String,
        attempts: u32,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SourceError>;
