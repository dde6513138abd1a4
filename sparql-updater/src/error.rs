//! Error types for updater runs

use sparql_updater_convert::ConvertError;
use sparql_updater_source::SourceError;
use sparql_updater_virtuoso::VirtuosoError;
use thiserror::Error;

/// Errors from an updater run or one of its dataset operations
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// The store did not come up within the wait budget; aborts the run
    #[error("Virtuoso not ready after waiting {waited_secs} seconds")]
    StoreUnavailable { waited_secs: u64 },

    /// Another run holds the run guard
    #[error("There's already an update in progress")]
    RunInProgress,

    /// Listing or fetching from the dataset source failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Converting an archive failed
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Talking to the store or its SPARQL endpoint failed
    #[error("Store error: {0}")]
    Store(VirtuosoError),

    /// Sending the run report failed
    #[error("Notification error: {0}")]
    Notify(String),

    /// A blocking conversion task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VirtuosoError> for UpdaterError {
    fn from(e: VirtuosoError) -> Self {
        match e {
            VirtuosoError::NotReady { waited_secs } => UpdaterError::StoreUnavailable { waited_secs },
            other => UpdaterError::Store(other),
        }
    }
}

impl From<reqwest::Error> for UpdaterError {
    fn from(e: reqwest::Error) -> Self {
        UpdaterError::Notify(e.to_string())
    }
}

impl From<tokio::task::JoinError> for UpdaterError {
    fn from(e: tokio::task::JoinError) -> Self {
        UpdaterError::Task(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
