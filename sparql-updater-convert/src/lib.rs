//! Archive to load-file conversion
//!
//! A dataset is published as a zip archive holding one small Turtle document
//! per record. [`ChunkedConverter`] concatenates those documents into one or
//! more gzip-compressed Turtle files that the store's bulk loader can ingest,
//! keeping namespace declarations only once per file and closing the last
//! file with the dataset's provenance statement.

pub mod converter;
pub mod error;
pub mod header;

pub use converter::{ChunkStats, ChunkedConverter};
pub use error::{ConvertError, Result};
pub use header::is_header_line;
