//! Run report
//!
//! Records what happened to every dataset during one run, plus a run-level
//! error when the run could not start. [`UpdateReport::summary`] renders the
//! text handed to the notifier.

use crate::dataset::Dataset;
use crate::progress::{duration_text, ProgressLogger};
use crate::server_info;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

/// Failed datasets listed in the summary before it is cut off.
pub const MAX_FAILED_LISTED: usize = 10;

/// Progress is logged at most this often.
const LOG_PROGRESS_EVERY: Duration = Duration::from_secs(180);

/// Outcome of one updater run.
#[derive(Debug)]
pub struct UpdateReport {
    node_id: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    total_sets: u64,
    created: Vec<String>,
    updated: Vec<String>,
    fixed: Vec<String>,
    removed: Vec<String>,
    unchanged: Vec<String>,
    failed: BTreeMap<String, String>,
    storage_location: Option<PathBuf>,
    fatal_error: Option<String>,
    interrupted: bool,
    progress: ProgressLogger,
}

impl UpdateReport {
    /// Start a report for a run over `total_sets` datasets needing action.
    ///
    /// `storage_location` is any path on the disk whose usage should be
    /// mentioned in the summary.
    pub fn new(node_id: impl Into<String>, storage_location: Option<PathBuf>, total_sets: u64) -> Self {
        Self {
            node_id: node_id.into(),
            start_time: Utc::now(),
            end_time: None,
            total_sets,
            created: Vec::new(),
            updated: Vec::new(),
            fixed: Vec::new(),
            removed: Vec::new(),
            unchanged: Vec::new(),
            failed: BTreeMap::new(),
            storage_location,
            fatal_error: None,
            interrupted: false,
            progress: ProgressLogger::new(total_sets, Some(LOG_PROGRESS_EVERY)),
        }
    }

    /// Report for a run that failed before any dataset was touched.
    pub fn aborted(node_id: impl Into<String>, error: impl ToString) -> Self {
        let mut report = Self::new(node_id, None, 0);
        report.progress = ProgressLogger::new(0, None);
        report.fatal_error = Some(error.to_string());
        report
    }

    pub fn add_created(&mut self, ds: &Dataset) {
        self.created.push(ds.id().to_string());
        self.progress.item_done();
    }

    pub fn add_updated(&mut self, ds: &Dataset) {
        self.updated.push(ds.id().to_string());
        self.progress.item_done();
    }

    pub fn add_fixed(&mut self, ds: &Dataset) {
        self.fixed.push(ds.id().to_string());
        self.progress.item_done();
    }

    pub fn add_removed(&mut self, ds: &Dataset) {
        self.removed.push(ds.id().to_string());
        self.progress.item_done();
    }

    /// Unchanged datasets do not count towards progress.
    pub fn add_unchanged(&mut self, ds: &Dataset) {
        self.unchanged.push(ds.id().to_string());
    }

    pub fn add_failed(&mut self, ds: &Dataset, reason: impl Into<String>) {
        self.failed.insert(ds.id().to_string(), reason.into());
        self.progress.item_done();
    }

    /// Mark the run as stopped before all datasets were processed.
    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn total_sets(&self) -> u64 {
        self.total_sets
    }

    pub fn created(&self) -> &[String] {
        &self.created
    }

    pub fn updated(&self) -> &[String] {
        &self.updated
    }

    pub fn fixed(&self) -> &[String] {
        &self.fixed
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn unchanged(&self) -> &[String] {
        &self.unchanged
    }

    pub fn failed(&self) -> &BTreeMap<String, String> {
        &self.failed
    }

    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Number of datasets with a recorded outcome, unchanged ones included.
    pub fn processed(&self) -> usize {
        self.created.len()
            + self.updated.len()
            + self.fixed.len()
            + self.removed.len()
            + self.unchanged.len()
            + self.failed.len()
    }

    /// Short text describing the run, suitable for a chat message.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("Update of ");
        if self.total_sets > 0 {
            let _ = write!(s, "{} data sets on ", self.total_sets);
        }
        let _ = write!(s, "SPARQL node {}", self.node_id);

        match self.end_time {
            None => s.push_str(" was aborted.\n"),
            Some(end) => {
                let elapsed = (end - self.start_time).to_std().unwrap_or_default();
                let _ = writeln!(s, " completed in {}.", duration_text(elapsed));
            }
        }

        if let Some(ref error) = self.fatal_error {
            let _ = writeln!(s, "It failed with error \"{error}\".");
        }
        if self.interrupted {
            s.push_str("The run was stopped before all data sets were processed.\n");
        }

        let _ = writeln!(
            s,
            "created: {}, updated: {}, fixed: {}, deleted: {}, unchanged: {}, failed: {}",
            self.created.len(),
            self.updated.len(),
            self.fixed.len(),
            self.removed.len(),
            self.unchanged.len(),
            self.failed.len()
        );

        if !self.failed.is_empty() {
            let _ = writeln!(s, "\nThe following {} datasets failed:", self.failed.len());
            for (id, reason) in self.failed.iter().take(MAX_FAILED_LISTED) {
                let _ = writeln!(s, "  {id}: {reason}");
            }
            if self.failed.len() > MAX_FAILED_LISTED {
                let _ = writeln!(
                    s,
                    "...(listing only first {MAX_FAILED_LISTED} failed datasets)"
                );
            }
        }

        if let Some(usage) = self
            .storage_location
            .as_deref()
            .and_then(server_info::disk_usage)
        {
            let _ = writeln!(s, "{usage}");
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SourceEntry, TargetEntry};
    use chrono::TimeZone;

    fn ds(id: &str) -> Dataset {
        Dataset::from_source(SourceEntry::new(id, Utc.timestamp_opt(1, 0).unwrap()), None)
    }

    #[test]
    fn test_summary_lists_all_counts_even_when_zero() {
        let mut report = UpdateReport::new("node-1", None, 0);
        report.finish();
        let summary = report.summary();
        assert!(summary.starts_with("Update of SPARQL node node-1 completed in "));
        assert!(summary.contains(
            "created: 0, updated: 0, fixed: 0, deleted: 0, unchanged: 0, failed: 0"
        ));
        assert!(!summary.contains("failed:\n"));
    }

    #[test]
    fn test_summary_counts_and_failures() {
        let mut report = UpdateReport::new("node-1", None, 4);
        report.add_created(&ds("1"));
        report.add_updated(&ds("2"));
        report.add_unchanged(&ds("3"));
        report.add_failed(&ds("4"), "exit code 1: boom");
        report.finish();

        let summary = report.summary();
        assert!(summary.starts_with("Update of 4 data sets on SPARQL node node-1"));
        assert!(summary.contains(
            "created: 1, updated: 1, fixed: 0, deleted: 0, unchanged: 1, failed: 1"
        ));
        assert!(summary.contains("The following 1 datasets failed:\n  4: exit code 1: boom\n"));
        assert_eq!(report.processed(), 4);
    }

    #[test]
    fn test_progress_counts_actions_only() {
        let mut report = UpdateReport::new("n", None, 3);
        report.add_unchanged(&ds("1"));
        report.add_created(&ds("2"));
        report.add_removed(&ds("3"));
        report.add_failed(&ds("4"), "exit code 1: boom");
        assert_eq!(report.progress.items_done(), 3);
        assert_eq!(report.processed(), 4);
    }

    #[test]
    fn test_failed_listing_is_capped() {
        let mut report = UpdateReport::new("n", None, 12);
        for i in 0..12 {
            report.add_failed(&ds(&format!("{i:02}")), "nope");
        }
        report.finish();

        let summary = report.summary();
        let listed = summary.lines().filter(|l| l.ends_with(": nope")).count();
        assert_eq!(listed, MAX_FAILED_LISTED);
        assert!(summary.contains("...(listing only first 10 failed datasets)"));
        // sorted by id: the last two are cut off
        assert!(summary.contains("  09: nope"));
        assert!(!summary.contains("  11: nope"));
    }

    #[test]
    fn test_aborted_report() {
        let report = UpdateReport::aborted("n", "Virtuoso not ready after waiting 60 seconds");
        let summary = report.summary();
        assert!(summary.starts_with("Update of SPARQL node n was aborted.\n"));
        assert!(summary.contains("It failed with error \"Virtuoso not ready after waiting 60 seconds\"."));
        assert_eq!(report.processed(), 0);
        assert!(report.end_time().is_none());
    }

    #[test]
    fn test_failed_replaces_previous_reason() {
        let mut report = UpdateReport::new("n", None, 1);
        let target_only = Dataset::target_only(TargetEntry::corrupt("9"));
        report.add_failed(&target_only, "first");
        report.add_failed(&target_only, "second");
        assert_eq!(report.failed().get("9").map(String::as_str), Some("second"));
    }
}
