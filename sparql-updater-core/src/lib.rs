//! Core model for keeping a triple store's dataset graphs in sync with a
//! mirror of per-dataset archives.
//!
//! # Architecture
//!
//! - [`dataset`]: the [`Dataset`] entity, its [`DatasetState`] and the pure
//!   [`classify`] transition function
//! - [`reconcile`]: full outer join of the source and target inventories
//! - [`command`]: [`CommandResult`], the outcome of one administrative operation
//! - [`report`]: [`UpdateReport`], the per-run outcome record and its summary text
//! - [`progress`]: rate-limited progress logging for long runs
//! - [`retry`]: [`RetryPolicy`] for bounded retries with exponential backoff
//! - [`server_info`]: node id and disk usage for reports
//! - [`vocab`]: IRIs and naming conventions shared by converter and store
//!
//! This crate performs no I/O beyond reading host information; the
//! collaborators that talk to the mirror and the store live in their own crates.

pub mod command;
pub mod dataset;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod server_info;
pub mod vocab;

pub use command::CommandResult;
pub use dataset::{classify, Dataset, DatasetState, SourceEntry, TargetEntry};
pub use progress::{clock_text, duration_text, ProgressLogger};
pub use reconcile::{reconcile, DatasetSelection};
pub use report::UpdateReport;
pub use retry::RetryPolicy;
