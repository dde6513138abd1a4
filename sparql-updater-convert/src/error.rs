//! Error types for archive conversion

use thiserror::Error;

/// Errors from converting a dataset archive
#[derive(Debug, Error)]
pub enum ConvertError {
    /// I/O error reading the archive or writing a chunk
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive could not be opened or an entry could not be read
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An archive entry is not valid UTF-8 text
    #[error("Entry {entry} of the archive is not UTF-8 text")]
    NotText { entry: String },

    /// `write_next` was called after the final chunk was written
    #[error("All chunks of dataset {0} have already been written")]
    Exhausted(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
