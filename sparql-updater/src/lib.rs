//! SPARQL updater
//!
//! Brings the dataset graphs of a triple store in line with a mirror of
//! per-dataset archives.
//!
//! # Architecture
//!
//! - [`updater`]: [`Updater`], one run: liveness wait, listing, reconciliation
//!   and the per-dataset create-or-update / remove protocol
//! - [`run_guard`]: [`RunGuard`], at most one run per process
//! - [`scheduler`]: [`Scheduler`], triggers runs and publishes their reports
//! - [`notify`]: [`Notifier`] implementations (Slack webhook, log only)
//!
//! The store, source and target are reached through the
//! [`GraphStore`](sparql_updater_virtuoso::GraphStore),
//! [`SourceInventory`](sparql_updater_source::SourceInventory) and
//! [`TargetInventory`](sparql_updater_virtuoso::TargetInventory) traits.

pub mod error;
pub mod notify;
pub mod run_guard;
pub mod scheduler;
pub mod updater;

pub use error::{Result, UpdaterError};
pub use notify::{LogNotifier, Notifier, SlackNotifier};
pub use run_guard::{RunGuard, RunPermit};
pub use scheduler::Scheduler;
pub use updater::{Updater, UpdaterOptions};
