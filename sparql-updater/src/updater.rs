//! One updater run
//!
//! ## Protocol
//!
//! A dataset is never loaded straight into its final graph. Chunks go into
//! the temp graph `<id>_new`; only when every chunk loaded does the final
//! graph get dropped and the temp graph renamed in its place. A failed load
//! leaves the temp graph behind, which the next run's target listing reports
//! as corrupt, so the dataset is cleaned and reloaded then.
//!
//! Per-dataset failures are recorded in the report and never stop the run.
//! The only run-level failures are an unreachable store and an inventory
//! that cannot be listed.

use crate::error::{Result, UpdaterError};
use sparql_updater_convert::ChunkedConverter;
use sparql_updater_core::{
    clock_text, reconcile, vocab, CommandResult, Dataset, DatasetSelection, DatasetState,
    UpdateReport,
};
use sparql_updater_source::SourceInventory;
use sparql_updater_virtuoso::{GraphStore, TargetInventory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::Instrument;

/// Tunables of a run.
#[derive(Debug, Clone)]
pub struct UpdaterOptions {
    /// Name of this node in reports
    pub node_id: String,
    /// Archive entries per load file; `0` loads a dataset in one go
    pub max_records_per_chunk: usize,
    /// How long to wait for the store before giving up; `None` skips the check
    pub max_wait: Option<Duration>,
    /// Datasets this run is restricted to
    pub selection: DatasetSelection,
    /// Prefix of dataset graph IRIs
    pub graph_base: String,
    /// Any path on the disk whose usage should be reported
    pub storage_location: Option<PathBuf>,
}

impl Default for UpdaterOptions {
    fn default() -> Self {
        Self {
            node_id: "unknown".to_string(),
            max_records_per_chunk: 0,
            max_wait: Some(Duration::from_secs(60)),
            selection: DatasetSelection::all(),
            graph_base: vocab::DEFAULT_GRAPH_BASE.to_string(),
            storage_location: None,
        }
    }
}

/// Drives one reconciliation run against its collaborators.
#[derive(Debug)]
pub struct Updater {
    source: Arc<dyn SourceInventory>,
    target: Arc<dyn TargetInventory>,
    store: Arc<dyn GraphStore>,
    options: UpdaterOptions,
}

impl Updater {
    pub fn new(
        source: Arc<dyn SourceInventory>,
        target: Arc<dyn TargetInventory>,
        store: Arc<dyn GraphStore>,
        options: UpdaterOptions,
    ) -> Self {
        Self {
            source,
            target,
            store,
            options,
        }
    }

    pub fn options(&self) -> &UpdaterOptions {
        &self.options
    }

    /// Run an update.
    ///
    /// `stop` is checked between datasets; once it reads `true` the run
    /// finishes with the datasets processed so far.
    pub async fn run(&self, stop: &watch::Receiver<bool>) -> Result<UpdateReport> {
        if let Some(max_wait) = self.options.max_wait {
            self.store.wait_until_reachable(max_wait).await?;
        }
        if let Some(usage) = self
            .options
            .storage_location
            .as_deref()
            .and_then(sparql_updater_core::server_info::disk_usage)
        {
            tracing::info!("{usage}");
        }

        let source = self.source.list().await?;
        let target = self.target.list().await?;
        let datasets = reconcile(source, target, &self.options.selection);
        let to_update = datasets.iter().filter(|ds| ds.needs_action()).count();
        tracing::info!(
            datasets = datasets.len(),
            to_update,
            "{} data sets need to be updated",
            to_update
        );

        let mut report = UpdateReport::new(
            self.options.node_id.clone(),
            self.options.storage_location.clone(),
            to_update as u64,
        );

        for ds in &datasets {
            let stopped = *stop.borrow();
            if stopped {
                tracing::warn!(processed = report.processed(), "update stopped before all data sets were processed");
                report.mark_interrupted();
                break;
            }
            let span = tracing::info_span!("dataset", id = %ds.id(), state = %ds.state());
            self.process(ds, &mut report).instrument(span).await;
        }

        report.finish();
        Ok(report)
    }

    async fn process(&self, ds: &Dataset, report: &mut UpdateReport) {
        match ds.state() {
            DatasetState::UpToDate => {
                tracing::trace!("no changes");
                report.add_unchanged(ds);
            }
            DatasetState::Missing => {
                tracing::debug!("new data set, downloading");
                match self.create_or_update(ds).await {
                    CommandResult::Success(_) => report.add_created(ds),
                    CommandResult::Failure(reason) => report.add_failed(ds, reason),
                }
            }
            DatasetState::Outdated => {
                tracing::debug!("outdated data set, downloading again");
                match self.create_or_update(ds).await {
                    CommandResult::Success(_) => report.add_updated(ds),
                    CommandResult::Failure(reason) => report.add_failed(ds, reason),
                }
            }
            DatasetState::Corrupt => {
                tracing::warn!("corrupt data set, removing temp graph and reloading");
                let result = folded(self.store.remove_temp_graph(ds.id()).await)
                    .and_then(|| self.create_or_update(ds))
                    .await;
                match result {
                    CommandResult::Success(_) => report.add_fixed(ds),
                    CommandResult::Failure(reason) => report.add_failed(ds, reason),
                }
            }
            DatasetState::ToRemove => {
                tracing::debug!("data set no longer available, removing");
                let result = folded(self.store.remove_temp_graph(ds.id()).await)
                    .and_then(|| async { folded(self.store.remove_graph(ds.id()).await) })
                    .await;
                match result {
                    CommandResult::Success(_) => report.add_removed(ds),
                    CommandResult::Failure(reason) => report.add_failed(ds, reason),
                }
            }
        }
    }

    async fn create_or_update(&self, ds: &Dataset) -> CommandResult {
        match self.try_create_or_update(ds).await {
            Ok(result) => {
                if let CommandResult::Failure(ref reason) = result {
                    tracing::error!(reason = %reason, "error creating or updating data set");
                }
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "error creating or updating data set");
                CommandResult::failure(e.to_string())
            }
        }
    }

    async fn try_create_or_update(&self, ds: &Dataset) -> Result<CommandResult> {
        let start = Instant::now();
        let id = ds.id();
        let Some(source_timestamp) = ds.source_timestamp() else {
            return Ok(CommandResult::failure(format!(
                "data set {id} has no source timestamp"
            )));
        };
        let folder = self.store.import_folder();
        let archive = LocalFile::new(folder.join(format!("{id}.zip")));
        let load_file = LocalFile::new(folder.join(format!("{id}.ttl.gz")));

        tracing::trace!(archive = %archive.path().display(), "downloading");
        self.source.fetch(id, archive.path()).await?;
        tracing::info!("download complete, generating files");

        let mut converter = ChunkedConverter::open(archive.path(), id, source_timestamp)?
            .with_max_records(self.options.max_records_per_chunk)
            .with_graph_base(self.options.graph_base.clone());
        let temp_graph = vocab::temp_graph_id(id);

        while converter.has_next() {
            let out = load_file.path().to_path_buf();
            let (returned, written) = tokio::task::spawn_blocking(move || {
                let written = converter.write_next(&out);
                (converter, written)
            })
            .await?;
            converter = returned;
            let chunk = written?;

            let result = self
                .store
                .ingest_chunk(&temp_graph)
                .instrument(tracing::info_span!(
                    "ingest_chunk",
                    chunk = chunk.chunk_number,
                    records = chunk.records,
                    is_final = chunk.is_final
                ))
                .await?;
            if let CommandResult::Failure(reason) = result {
                // temp graph stays; the next run sees it and cleans up
                return Ok(CommandResult::Failure(reason));
            }
            tracing::debug!(chunk = chunk.chunk_number, result = %result.message(), "chunk loaded");
        }
        drop(converter);

        let result = folded(self.store.remove_graph(id).await)
            .and_then(|| async { folded(self.store.rename_temp_to_final(id).await) })
            .await;
        if result.is_success() {
            tracing::info!(
                "Ingesting dataset {} took: {}",
                id,
                clock_text(start.elapsed())
            );
        }
        Ok(result)
    }
}

/// Fold an operation error into a failure result.
fn folded(result: sparql_updater_virtuoso::Result<CommandResult>) -> CommandResult {
    result.unwrap_or_else(|e| CommandResult::failure(UpdaterError::from(e).to_string()))
}

/// A downloaded or generated file, deleted on drop.
#[derive(Debug)]
struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    fn new(path: PathBuf) -> Self {
        // leftover from an interrupted run
        remove_quietly(&path);
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalFile {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::trace!(file = %path.display(), "deleted"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(file = %path.display(), error = %e, "could not delete file"),
    }
}
