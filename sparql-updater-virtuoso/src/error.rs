//! Error types for Virtuoso operations

use thiserror::Error;

/// Errors from talking to Virtuoso
#[derive(Debug, Error)]
pub enum VirtuosoError {
    /// I/O error writing a script or reading the import folder
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The isql process could not be run to completion
    #[error("Could not run {script}: {reason}")]
    Command { script: String, reason: String },

    /// The store did not accept connections within the wait budget
    #[error("Virtuoso not ready after waiting {waited_secs} seconds")]
    NotReady { waited_secs: u64 },

    /// Network or HTTP error talking to the SPARQL endpoint
    #[error("SPARQL endpoint error: {0}")]
    Http(String),

    /// The endpoint answered with a non-success status
    #[error("SPARQL query failed with status {status}: {body}")]
    Query { status: u16, body: String },

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for VirtuosoError {
    fn from(e: reqwest::Error) -> Self {
        VirtuosoError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VirtuosoError>;
