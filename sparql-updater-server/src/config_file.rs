//! Configuration file support
//!
//! Loads settings from a TOML file and merges them under the CLI args and
//! environment variables.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Config file
//! 4. Hardcoded defaults

use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sparql-updater.toml";

// ---------------------------------------------------------------------------
// File config serde types (all Option; absence means "not set in file")
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct UpdaterFileConfig {
    pub log_level: Option<String>,

    /// `[virtuoso]`
    #[serde(default)]
    pub virtuoso: Option<VirtuosoFileConfig>,

    /// `[folders]`
    #[serde(default)]
    pub folders: Option<FoldersFileConfig>,

    /// `[update]`
    #[serde(default)]
    pub update: Option<UpdateFileConfig>,

    /// `[report]`
    #[serde(default)]
    pub report: Option<ReportFileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct VirtuosoFileConfig {
    pub isql_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub endpoint: Option<String>,
    pub max_wait_secs: Option<u64>,
    pub command_attempts: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FoldersFileConfig {
    pub ttl: Option<String>,
    pub sql: Option<String>,
    pub mirror: Option<String>,
    pub download_attempts: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct UpdateFileConfig {
    pub max_records_per_chunk: Option<usize>,
    pub datasets: Option<Vec<String>>,
    pub graph_base: Option<String>,
    pub corruption_rule: Option<String>,
    pub interval_secs: Option<u64>,
    pub run_on_startup: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ReportFileConfig {
    pub slack_webhook: Option<String>,
}

/// Errors from config file loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
}

// ---------------------------------------------------------------------------
// Loading and discovery
// ---------------------------------------------------------------------------

pub fn load_config(path: &Path) -> Result<UpdaterFileConfig, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(UpdaterFileConfig::default());
    }

    toml::from_str(&content).map_err(|e| ConfigFileError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Resolve the config file path.
///
/// An explicit path must exist; otherwise `sparql-updater.toml` in the
/// working directory is used when present. `None` is not an error.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.is_file() {
            return Some(p.to_path_buf());
        }
        warn!(path = %p.display(), "Config file not found at specified path");
        return None;
    }

    let fallback = std::env::current_dir().ok()?.join(DEFAULT_CONFIG_FILE);
    fallback.is_file().then_some(fallback)
}

// ---------------------------------------------------------------------------
// Apply file config to UpdaterConfig (value_source gating)
// ---------------------------------------------------------------------------

/// All clap arg IDs referenced by `apply_to_updater_config`, checked against
/// the clap definition by `test_config_file_arg_ids_match_updater_config`.
pub const CONFIG_FILE_ARG_IDS: &[&str] = &[
    "log_level",
    "isql_path",
    "virtuoso_host",
    "virtuoso_port",
    "virtuoso_user",
    "virtuoso_password",
    "virtuoso_endpoint",
    "max_wait_secs",
    "command_attempts",
    "ttl_folder",
    "sql_folder",
    "mirror_dir",
    "download_attempts",
    "max_records_per_chunk",
    "datasets",
    "graph_base",
    "corruption_rule",
    "update_interval_secs",
    "run_on_startup",
    "slack_webhook",
];

/// Apply config file values to an `UpdaterConfig`, but only for fields the
/// user did NOT set with a CLI argument or environment variable.
pub fn apply_to_updater_config(
    file: &UpdaterFileConfig,
    config: &mut UpdaterConfig,
    matches: &ArgMatches,
) {
    use clap::parser::ValueSource;

    // Arg IDs are the field names (underscores), not the long flags.
    let is_default = |arg_name: &str| -> bool {
        matches!(
            matches.value_source(arg_name),
            None | Some(ValueSource::DefaultValue)
        )
    };

    macro_rules! apply {
        ($arg:literal, $value:expr, $target:expr) => {
            if is_default($arg) {
                if let Some(v) = $value {
                    $target = v;
                }
            }
        };
    }

    apply!("log_level", file.log_level.clone(), config.log_level);

    if let Some(ref v) = file.virtuoso {
        apply!("isql_path", v.isql_path.as_ref().map(PathBuf::from), config.isql_path);
        apply!("virtuoso_host", v.host.clone(), config.virtuoso_host);
        apply!("virtuoso_port", v.port, config.virtuoso_port);
        apply!("virtuoso_user", v.user.clone(), config.virtuoso_user);
        apply!("virtuoso_password", v.password.clone().map(Some), config.virtuoso_password);
        apply!("virtuoso_endpoint", v.endpoint.clone(), config.virtuoso_endpoint);
        apply!("max_wait_secs", v.max_wait_secs, config.max_wait_secs);
        apply!("command_attempts", v.command_attempts, config.command_attempts);
    }

    if let Some(ref f) = file.folders {
        apply!("ttl_folder", f.ttl.as_ref().map(PathBuf::from), config.ttl_folder);
        apply!("sql_folder", f.sql.as_ref().map(PathBuf::from), config.sql_folder);
        apply!("mirror_dir", f.mirror.as_ref().map(PathBuf::from), config.mirror_dir);
        apply!("download_attempts", f.download_attempts, config.download_attempts);
    }

    if let Some(ref u) = file.update {
        apply!(
            "max_records_per_chunk",
            u.max_records_per_chunk,
            config.max_records_per_chunk
        );
        apply!("datasets", u.datasets.clone(), config.datasets);
        apply!("graph_base", u.graph_base.clone(), config.graph_base);
        if is_default("corruption_rule") {
            if let Some(ref rule) = u.corruption_rule {
                match rule.parse() {
                    Ok(rule) => config.corruption_rule = rule,
                    Err(e) => warn!(value = %rule, error = %e, "Invalid corruption_rule in config file, ignoring"),
                }
            }
        }
        apply!("update_interval_secs", u.interval_secs.map(Some), config.update_interval_secs);
        apply!("run_on_startup", u.run_on_startup, config.run_on_startup);
    }

    if let Some(ref r) = file.report {
        apply!("slack_webhook", r.slack_webhook.clone().map(Some), config.slack_webhook);
    }
}

/// Load the config file (if found) and merge its values into `config`.
pub fn load_and_merge_config(
    config: &mut UpdaterConfig,
    matches: &ArgMatches,
) -> Result<(), ConfigFileError> {
    let Some(path) = resolve_config_path(config.config_file.as_deref()) else {
        debug!("No config file found, using CLI args and defaults only");
        return Ok(());
    };

    info!(path = %path.display(), "Loading configuration file");
    let file_config = load_config(&path)?;
    apply_to_updater_config(&file_config, config, matches);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};
    use sparql_updater_virtuoso::CorruptionRule;

    const SAMPLE: &str = r#"
log_level = "debug"

[virtuoso]
host = "virtuoso.internal"
port = 1112
password = "from-file"
max_wait_secs = 120

[folders]
ttl = "/data/ttl"
mirror = "/mnt/ftp/TTL"

[update]
max_records_per_chunk = 5000
datasets = ["2048", "9200"]
corruption_rule = "multiple-dates"
interval_secs = 86400

[report]
slack_webhook = "https://hooks.slack.com/services/T/B/X"
"#;

    fn parsed(args: &[&str]) -> (UpdaterConfig, ArgMatches) {
        let matches = UpdaterConfig::command()
            .try_get_matches_from(std::iter::once("sparql-updater").chain(args.iter().copied()))
            .unwrap();
        let config = UpdaterConfig::from_arg_matches(&matches).unwrap();
        (config, matches)
    }

    #[test]
    fn test_load_toml() {
        let file: UpdaterFileConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(file.log_level.as_deref(), Some("debug"));
        let virtuoso = file.virtuoso.unwrap();
        assert_eq!(virtuoso.port, Some(1112));
        assert_eq!(virtuoso.user, None);
        assert_eq!(file.update.unwrap().datasets, Some(vec!["2048".to_string(), "9200".to_string()]));
    }

    #[test]
    fn test_file_fills_defaults() {
        let file: UpdaterFileConfig = toml::from_str(SAMPLE).unwrap();
        let (mut config, matches) = parsed(&[]);
        apply_to_updater_config(&file, &mut config, &matches);

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.virtuoso_host, "virtuoso.internal");
        assert_eq!(config.virtuoso_port, 1112);
        assert_eq!(config.virtuoso_user, "dba");
        assert_eq!(config.virtuoso_password.as_deref(), Some("from-file"));
        assert_eq!(config.max_wait_secs, 120);
        assert_eq!(config.ttl_folder, PathBuf::from("/data/ttl"));
        assert_eq!(config.sql_folder, PathBuf::from("/tmp/sparql-updater/sql"));
        assert_eq!(config.mirror_dir, PathBuf::from("/mnt/ftp/TTL"));
        assert_eq!(config.max_records_per_chunk, 5000);
        assert_eq!(config.datasets, vec!["2048", "9200"]);
        assert_eq!(config.corruption_rule, CorruptionRule::MultipleDates);
        assert_eq!(config.update_interval_secs, Some(86400));
        assert!(config.slack_webhook.is_some());
    }

    #[test]
    fn test_cli_wins_over_file() {
        let file: UpdaterFileConfig = toml::from_str(SAMPLE).unwrap();
        let (mut config, matches) = parsed(&[
            "--virtuoso-port",
            "1200",
            "--dataset",
            "11",
            "--corruption-rule",
            "missing-date-only",
        ]);
        apply_to_updater_config(&file, &mut config, &matches);

        assert_eq!(config.virtuoso_port, 1200);
        assert_eq!(config.datasets, vec!["11"]);
        assert_eq!(config.corruption_rule, CorruptionRule::MissingDateOnly);
        assert_eq!(config.virtuoso_host, "virtuoso.internal");
    }

    #[test]
    fn test_invalid_corruption_rule_is_ignored() {
        let file: UpdaterFileConfig =
            toml::from_str("[update]\ncorruption_rule = \"sometimes\"\n").unwrap();
        let (mut config, matches) = parsed(&[]);
        apply_to_updater_config(&file, &mut config, &matches);
        assert_eq!(config.corruption_rule, CorruptionRule::TempGraph);
    }

    #[test]
    fn test_load_config_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("updater.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert!(load_config(&path).unwrap().folders.is_some());

        let empty = dir.path().join("empty.toml");
        std::fs::write(&empty, "  \n").unwrap();
        assert!(load_config(&empty).unwrap().virtuoso.is_none());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[virtuoso\nport = 1").unwrap();
        assert!(matches!(
            load_config(&broken),
            Err(ConfigFileError::Parse { .. })
        ));

        assert_eq!(resolve_config_path(Some(&path)), Some(path.clone()));
        assert_eq!(resolve_config_path(Some(&dir.path().join("missing.toml"))), None);
    }

    #[test]
    fn test_config_file_arg_ids_match_updater_config() {
        let cmd = UpdaterConfig::command();
        let known_args: Vec<&str> = cmd
            .get_arguments()
            .map(|arg| arg.get_id().as_str())
            .collect();

        for id in CONFIG_FILE_ARG_IDS {
            assert!(
                known_args.contains(id),
                "CONFIG_FILE_ARG_IDS contains '{id}' which does not exist in \
                 UpdaterConfig's clap definition. Did a field get renamed?"
            );
        }
    }
}
