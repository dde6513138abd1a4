//! Chunked archive converter.
//!
//! ## Design
//!
//! The converter owns the open archive and a cursor over its entries. Every
//! [`ChunkedConverter::write_next`] call consumes up to `max_records` entries
//! and writes them to a fresh gzip file; the cursor only moves forward, so a
//! chunk can never be produced twice.
//!
//! Header directives are kept for the first entry of every chunk and dropped
//! from the entries that follow it, so each chunk stays a standalone Turtle
//! document without repeating the shared namespace block per record.
//!
//! The chunk written once the archive is exhausted carries the provenance
//! statement. An empty archive still yields exactly one chunk holding only
//! that statement, so the target graph always records its source timestamp.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use sparql_updater_core::vocab::{self, dcterms, xsd};
use zip::ZipArchive;

use crate::error::{ConvertError, Result};
use crate::header::is_header_line;

/// Upper bound of the buffer reserved up front for one archive entry.
const MAX_ENTRY_PREALLOC: u64 = 1 << 20;

/// What one [`ChunkedConverter::write_next`] call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStats {
    /// Chunk file that was written
    pub path: PathBuf,
    /// 1-based chunk number within the dataset
    pub chunk_number: usize,
    /// Archive entries written to this chunk
    pub records: usize,
    /// Whether this chunk carries the provenance statement
    pub is_final: bool,
}

/// Streams a dataset archive into gzip Turtle chunks.
pub struct ChunkedConverter {
    dataset_id: String,
    source_timestamp: DateTime<Utc>,
    archive: ZipArchive<BufReader<File>>,
    /// Index of the next unread file entry; directories are skipped eagerly.
    cursor: usize,
    max_records: usize,
    graph_base: String,
    chunks_written: usize,
    records_written: usize,
    final_written: bool,
}

impl ChunkedConverter {
    /// Open `archive_path` for conversion.
    ///
    /// Defaults: one chunk for the whole archive (`max_records = 0`) and the
    /// default dataset graph base.
    pub fn open(
        archive_path: &Path,
        dataset_id: impl Into<String>,
        source_timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let file = File::open(archive_path)?;
        let archive = ZipArchive::new(BufReader::new(file))?;
        let mut converter = Self {
            dataset_id: dataset_id.into(),
            source_timestamp,
            archive,
            cursor: 0,
            max_records: 0,
            graph_base: vocab::DEFAULT_GRAPH_BASE.to_string(),
            chunks_written: 0,
            records_written: 0,
            final_written: false,
        };
        converter.skip_directories()?;
        tracing::debug!(
            dataset = %converter.dataset_id,
            entries = converter.archive.len(),
            archive = %archive_path.display(),
            "archive opened"
        );
        Ok(converter)
    }

    /// Cap the number of archive entries per chunk. `0` means unlimited.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Graph IRI prefix used for the provenance statement's subject.
    pub fn with_graph_base(mut self, graph_base: impl Into<String>) -> Self {
        self.graph_base = graph_base.into();
        self
    }

    /// Whether another chunk remains to be written.
    pub fn has_next(&self) -> bool {
        !self.final_written
    }

    /// Number of chunks written so far.
    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    /// Number of archive entries written so far, across all chunks.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Write the next chunk to `out` (gzip-compressed Turtle).
    ///
    /// Returns [`ConvertError::Exhausted`] once the final chunk has been
    /// written.
    pub fn write_next(&mut self, out: &Path) -> Result<ChunkStats> {
        if self.final_written {
            return Err(ConvertError::Exhausted(self.dataset_id.clone()));
        }
        tracing::trace!(dataset = %self.dataset_id, chunk = %out.display(), "writing chunk");

        let file = File::create(out)?;
        let mut writer = GzEncoder::new(BufWriter::new(file), Compression::default());

        let mut records = 0usize;
        while !self.is_exhausted() && (self.max_records == 0 || records < self.max_records) {
            self.write_entry(&mut writer, records == 0)?;
            records += 1;
            self.cursor += 1;
            self.skip_directories()?;
        }

        let is_final = self.is_exhausted();
        if is_final {
            writer.write_all(self.provenance_statement().as_bytes())?;
        }
        writer.finish()?.flush()?;

        self.chunks_written += 1;
        self.records_written += records;
        self.final_written = is_final;

        tracing::debug!(
            dataset = %self.dataset_id,
            chunk_number = self.chunks_written,
            records,
            is_final,
            "chunk written"
        );

        Ok(ChunkStats {
            path: out.to_path_buf(),
            chunk_number: self.chunks_written,
            records,
            is_final,
        })
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.archive.len()
    }

    fn skip_directories(&mut self) -> Result<()> {
        while !self.is_exhausted() && self.archive.by_index(self.cursor)?.is_dir() {
            self.cursor += 1;
        }
        Ok(())
    }

    fn write_entry<W: Write>(&mut self, writer: &mut W, first_in_chunk: bool) -> Result<()> {
        let mut entry = self.archive.by_index(self.cursor)?;
        // declared sizes come from the archive and are not trusted
        let mut bytes = Vec::with_capacity(entry.size().min(MAX_ENTRY_PREALLOC) as usize);
        entry.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|_| ConvertError::NotText {
            entry: entry.name().to_string(),
        })?;

        for line in text.lines() {
            if first_in_chunk || !is_header_line(line) {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// `<base+id> dcterms:modified "ts"^^xsd:dateTime .` on its own paragraph.
    ///
    /// The timestamp is written at whole seconds, the precision the source
    /// inventory compares at.
    fn provenance_statement(&self) -> String {
        format!(
            "\n\n<{}> <{}> \"{}\"^^<{}> .\n",
            vocab::graph_iri(&self.graph_base, &self.dataset_id),
            dcterms::MODIFIED,
            self.source_timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            xsd::DATE_TIME
        )
    }
}

impl std::fmt::Debug for ChunkedConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedConverter")
            .field("dataset_id", &self.dataset_id)
            .field("cursor", &self.cursor)
            .field("entries", &self.archive.len())
            .field("max_records", &self.max_records)
            .field("chunks_written", &self.chunks_written)
            .field("final_written", &self.final_written)
            .finish()
    }
}
