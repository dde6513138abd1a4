//! Dataset archives in a mirror directory

use crate::error::{Result, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sparql_updater_core::{RetryPolicy, SourceEntry};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ARCHIVE_EXTENSION: &str = ".zip";

/// Lists published datasets and retrieves their archives.
#[async_trait]
pub trait SourceInventory: Debug + Send + Sync {
    /// Every published dataset with the modification time of its archive.
    async fn list(&self) -> Result<Vec<SourceEntry>>;

    /// Copy the archive of `dataset_id` to `dest`.
    async fn fetch(&self, dataset_id: &str, dest: &Path) -> Result<()>;
}

/// [`SourceInventory`] over a directory of `<id>.zip` files.
#[derive(Debug, Clone)]
pub struct MirrorDirectory {
    root: PathBuf,
    retry: RetryPolicy,
}

impl MirrorDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retry: RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(30)),
        }
    }

    /// Total copy attempts per archive, at least 1.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.retry = self.retry.with_attempts(attempts);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn archive_path(&self, dataset_id: &str) -> PathBuf {
        self.root.join(format!("{dataset_id}{ARCHIVE_EXTENSION}"))
    }
}

/// Dataset id of an archive file name: everything before the first `.`.
pub fn dataset_id(file_name: &str) -> Option<&str> {
    if !file_name.ends_with(ARCHIVE_EXTENSION) {
        return None;
    }
    let id = file_name.split('.').next()?;
    (!id.is_empty()).then_some(id)
}

#[async_trait]
impl SourceInventory for MirrorDirectory {
    async fn list(&self) -> Result<Vec<SourceEntry>> {
        tracing::info!(mirror = %self.root.display(), "listing source datasets");
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        let mut entries = Vec::new();

        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    // keep what was read so far
                    tracing::error!(error = %e, "error listing data sets");
                    break;
                }
            };
            let file_name = entry.file_name();
            let Some(id) = file_name.to_str().and_then(dataset_id) else {
                continue;
            };
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                // provenance literals carry whole seconds
                Ok(modified) => DateTime::<Utc>::from(modified).trunc_subsecs(0),
                Err(e) => {
                    tracing::warn!(dataset = %id, error = %e, "cannot read archive timestamp, skipping");
                    continue;
                }
            };
            tracing::trace!(dataset = %id, modified = %modified, "found source dataset");
            entries.push(SourceEntry::new(id, modified));
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!(datasets = entries.len(), "source datasets listed");
        Ok(entries)
    }

    async fn fetch(&self, dataset_id: &str, dest: &Path) -> Result<()> {
        let src = self.archive_path(dataset_id);
        if !tokio::fs::try_exists(&src).await? {
            return Err(SourceError::NotFound(dataset_id.to_string()));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match tokio::fs::copy(&src, dest).await {
                Ok(bytes) => {
                    tracing::debug!(dataset = %dataset_id, bytes, dest = %dest.display(), "archive downloaded");
                    return Ok(());
                }
                Err(e) => e,
            };
            let Some(delay) = self.retry.delay_after(attempt) else {
                return Err(SourceError::FetchFailed {
                    id: dataset_id.to_string(),
                    attempts: attempt,
                    reason: error.to_string(),
                });
            };
            tracing::warn!(
                dataset = %dataset_id,
                attempt,
                error = %error,
                "failed to download archive, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_id() {
        assert_eq!(dataset_id("2048.zip"), Some("2048"));
        assert_eq!(dataset_id("2048.ttl.zip"), Some("2048"));
        assert_eq!(dataset_id("2048.zip.md5sum"), None);
        assert_eq!(dataset_id(".zip"), None);
        assert_eq!(dataset_id("readme.txt"), None);
    }
}
