//! Updater configuration

use clap::{Parser, Subcommand};
use sparql_updater_virtuoso::CorruptionRule;
use std::path::PathBuf;
use std::time::Duration;

/// What the process does after start-up
#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Run a single update and exit
    Run,
    /// Keep running, updating on the configured interval
    #[default]
    Serve,
}

/// SPARQL updater configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "sparql-updater")]
#[command(about = "Keeps Virtuoso dataset graphs in sync with a mirror of dataset archives")]
pub struct UpdaterConfig {
    #[command(subcommand)]
    pub mode: Option<Mode>,

    /// Path to a TOML config file
    #[arg(long = "config", env = "SPARQL_UPDATER_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SPARQL_UPDATER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    // === Virtuoso ===
    /// Path of the isql binary
    #[arg(
        long,
        env = "SPARQL_UPDATER_ISQL_PATH",
        default_value = "/opt/virtuoso-opensource/bin/isql"
    )]
    pub isql_path: PathBuf,

    /// Host Virtuoso listens on
    #[arg(long, env = "SPARQL_UPDATER_VIRTUOSO_HOST", default_value = "localhost")]
    pub virtuoso_host: String,

    /// Virtuoso isql port
    #[arg(long, env = "SPARQL_UPDATER_VIRTUOSO_PORT", default_value = "1111")]
    pub virtuoso_port: u16,

    /// Virtuoso user
    #[arg(long, env = "SPARQL_UPDATER_VIRTUOSO_USER", default_value = "dba")]
    pub virtuoso_user: String,

    /// Virtuoso password
    #[arg(long, env = "SPARQL_UPDATER_VIRTUOSO_PASSWORD", hide_env_values = true)]
    pub virtuoso_password: Option<String>,

    /// SPARQL endpoint used to list the dataset graphs
    #[arg(
        long,
        env = "SPARQL_UPDATER_VIRTUOSO_ENDPOINT",
        default_value = "http://localhost:8890/sparql"
    )]
    pub virtuoso_endpoint: String,

    /// Seconds to wait for Virtuoso before a run gives up; 0 skips the check
    #[arg(long, env = "SPARQL_UPDATER_MAX_WAIT_SECS", default_value = "60")]
    pub max_wait_secs: u64,

    /// Attempts per isql command that could not be started
    #[arg(long, env = "SPARQL_UPDATER_COMMAND_ATTEMPTS", default_value = "3")]
    pub command_attempts: u32,

    // === Folders ===
    /// Folder the load files are generated in (must be in Virtuoso's DirsAllowed)
    #[arg(long, env = "SPARQL_UPDATER_TTL_FOLDER", default_value = "/tmp/sparql-updater/ttl")]
    pub ttl_folder: PathBuf,

    /// Scratch folder for isql scripts
    #[arg(long, env = "SPARQL_UPDATER_SQL_FOLDER", default_value = "/tmp/sparql-updater/sql")]
    pub sql_folder: PathBuf,

    /// Directory holding the published `<id>.zip` dataset archives
    #[arg(long, env = "SPARQL_UPDATER_MIRROR_DIR", default_value = "/mnt/datasets/TTL")]
    pub mirror_dir: PathBuf,

    /// Attempts per archive download
    #[arg(long, env = "SPARQL_UPDATER_DOWNLOAD_ATTEMPTS", default_value = "3")]
    pub download_attempts: u32,

    // === Run ===
    /// Archive entries per load file; 0 loads a dataset in one go
    #[arg(long, env = "SPARQL_UPDATER_MAX_RECORDS_PER_CHUNK", default_value = "0")]
    pub max_records_per_chunk: usize,

    /// Only update these datasets (can be specified multiple times)
    #[arg(long = "dataset", env = "SPARQL_UPDATER_DATASETS", value_delimiter = ',')]
    pub datasets: Vec<String>,

    /// Prefix of the dataset graph IRIs
    #[arg(
        long,
        env = "SPARQL_UPDATER_GRAPH_BASE",
        default_value = "http://data.europeana.eu/dataset/"
    )]
    pub graph_base: String,

    /// When a dataset graph counts as corrupt (temp-graph, multiple-dates, missing-date-only)
    #[arg(long, env = "SPARQL_UPDATER_CORRUPTION_RULE", default_value = "temp-graph")]
    pub corruption_rule: CorruptionRule,

    // === Schedule ===
    /// Seconds between scheduled updates (serve mode); unset disables the schedule
    #[arg(long, env = "SPARQL_UPDATER_UPDATE_INTERVAL_SECS")]
    pub update_interval_secs: Option<u64>,

    /// Start an update right away (serve mode)
    #[arg(long, env = "SPARQL_UPDATER_RUN_ON_STARTUP")]
    pub run_on_startup: bool,

    // === Reporting ===
    /// Slack webhook the run report is posted to
    #[arg(long, env = "SPARQL_UPDATER_SLACK_WEBHOOK", hide_env_values = true)]
    pub slack_webhook: Option<String>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            mode: None,
            config_file: None,
            log_level: "info".to_string(),
            isql_path: PathBuf::from("/opt/virtuoso-opensource/bin/isql"),
            virtuoso_host: "localhost".to_string(),
            virtuoso_port: 1111,
            virtuoso_user: "dba".to_string(),
            virtuoso_password: None,
            virtuoso_endpoint: "http://localhost:8890/sparql".to_string(),
            max_wait_secs: 60,
            command_attempts: 3,
            ttl_folder: PathBuf::from("/tmp/sparql-updater/ttl"),
            sql_folder: PathBuf::from("/tmp/sparql-updater/sql"),
            mirror_dir: PathBuf::from("/mnt/datasets/TTL"),
            download_attempts: 3,
            max_records_per_chunk: 0,
            datasets: Vec::new(),
            graph_base: "http://data.europeana.eu/dataset/".to_string(),
            corruption_rule: CorruptionRule::default(),
            update_interval_secs: None,
            run_on_startup: false,
            slack_webhook: None,
        }
    }
}

impl UpdaterConfig {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_default()
    }

    pub fn max_wait(&self) -> Option<Duration> {
        (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs))
    }

    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        if self.virtuoso_password.as_deref().map_or(true, str::is_empty) {
            return Err(
                "a Virtuoso password is required (--virtuoso-password or SPARQL_UPDATER_VIRTUOSO_PASSWORD)"
                    .to_string(),
            );
        }
        if !self.graph_base.ends_with('/') && !self.graph_base.ends_with('#') {
            return Err(format!(
                "graph_base must end with '/' or '#', got {}",
                self.graph_base
            ));
        }
        if self.mode() == Mode::Serve && self.update_interval().is_none() && !self.run_on_startup {
            tracing::warn!("serve mode without --update-interval-secs or --run-on-startup does nothing");
        }
        Ok(())
    }

    /// Log the settings an operator checks first
    pub fn log_important_settings(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  Virtuoso endpoint = {}", self.virtuoso_endpoint);
        tracing::info!("  Virtuoso port = {}", self.virtuoso_port);
        tracing::debug!(
            isql = %self.isql_path.display(),
            ttl_folder = %self.ttl_folder.display(),
            sql_folder = %self.sql_folder.display(),
            mirror_dir = %self.mirror_dir.display(),
            max_records_per_chunk = self.max_records_per_chunk,
            corruption_rule = %self.corruption_rule,
            "other settings"
        );
    }
}
