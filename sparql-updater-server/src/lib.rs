//! SPARQL updater command line
//!
//! - [`config`]: clap/env settings ([`UpdaterConfig`])
//! - [`config_file`]: optional TOML file merged under CLI and env values
//! - [`telemetry`]: tracing subscriber setup
//! - [`app`]: builds the updater from the settings and runs the chosen mode

pub mod app;
pub mod config;
pub mod config_file;
pub mod telemetry;

pub use app::{execute, AppError};
pub use config::{Mode, UpdaterConfig};
