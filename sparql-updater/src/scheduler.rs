//! Triggering runs and publishing their reports

use crate::error::{Result, UpdaterError};
use crate::notify::Notifier;
use crate::run_guard::RunGuard;
use crate::updater::Updater;
use sparql_updater_core::UpdateReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// Runs the [`Updater`] on demand or on an interval, one run at a time.
#[derive(Debug)]
pub struct Scheduler {
    updater: Arc<Updater>,
    notifier: Arc<dyn Notifier>,
    guard: RunGuard,
}

impl Scheduler {
    pub fn new(updater: Arc<Updater>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            updater,
            notifier,
            guard: RunGuard::new(),
        }
    }

    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    /// Run an update now and publish its report.
    ///
    /// Fails with [`UpdaterError::RunInProgress`] without waiting when a
    /// run is already going. Any other run-level error is turned into an
    /// aborted report, so a report is always produced and published.
    pub async fn trigger(&self, stop: &watch::Receiver<bool>) -> Result<UpdateReport> {
        let Some(_permit) = self.guard.try_acquire() else {
            tracing::error!("There's already an update in progress! Aborting...");
            return Err(UpdaterError::RunInProgress);
        };

        tracing::info!("Starting update...");
        let report = match self.updater.run(stop).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "error running the update");
                UpdateReport::aborted(self.updater.options().node_id.clone(), &e)
            }
        };
        tracing::info!("Finished update.");
        tracing::info!("{}", report.summary());

        if let Err(e) = self.notifier.publish(&report).await {
            tracing::error!(error = %e, "failed to publish the update report");
        }
        Ok(report)
    }

    /// Trigger runs every `interval` (and once right away when
    /// `run_on_startup`) until `shutdown` reads `true`.
    ///
    /// Triggers that fire while a run is going are refused, not queued. On
    /// shutdown the running update is asked to stop after its current
    /// dataset and awaited.
    pub async fn serve(
        self: Arc<Self>,
        interval: Option<Duration>,
        run_on_startup: bool,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut runs = JoinSet::new();
        if run_on_startup {
            runs.spawn(Arc::clone(&self).triggered(shutdown.clone()));
        }

        let mut ticker = interval.map(|period| {
            tracing::info!(interval_secs = period.as_secs(), "SPARQL data update schedule");
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        if ticker.is_none() {
            tracing::warn!("No schedule specified for updating SPARQL data! Automatic update is off!");
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    let stopping = *shutdown.borrow();
                    if changed.is_err() || stopping {
                        break;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    runs.spawn(Arc::clone(&self).triggered(shutdown.clone()));
                }
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "update task failed");
                    }
                }
            }
        }

        tracing::info!("Shutting down update scheduler...");
        while let Some(joined) = runs.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "update task failed");
            }
        }
    }

    async fn triggered(self: Arc<Self>, stop: watch::Receiver<bool>) {
        // refusal is already logged by trigger
        let _ = self.trigger(&stop).await;
    }
}

async fn next_tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
