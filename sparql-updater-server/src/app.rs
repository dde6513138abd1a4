//! Wiring the configured collaborators into a [`Scheduler`]

use crate::config::{Mode, UpdaterConfig};
use sparql_updater::{LogNotifier, Notifier, Scheduler, SlackNotifier, Updater, UpdaterOptions};
use sparql_updater_core::{server_info, DatasetSelection};
use sparql_updater_source::{MirrorDirectory, SourceInventory};
use sparql_updater_virtuoso::{
    GraphStore, IsqlConnection, SparqlClient, SparqlTargetInventory, TargetInventory,
    VirtuosoGraphManager,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Errors while starting up or running
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot prepare folder {path}: {source}")]
    Folder {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Virtuoso(#[from] sparql_updater_virtuoso::VirtuosoError),

    #[error(transparent)]
    Updater(#[from] sparql_updater::UpdaterError),

    #[error("Update failed: {0}")]
    RunFailed(String),
}

/// Create the load file and script folders if absent.
pub fn prepare_folders(config: &UpdaterConfig) -> Result<(), AppError> {
    for path in [&config.ttl_folder, &config.sql_folder] {
        std::fs::create_dir_all(path).map_err(|source| AppError::Folder {
            path: path.clone(),
            source,
        })?;
    }
    Ok(())
}

pub fn build_updater(config: &UpdaterConfig) -> Result<Updater, AppError> {
    let connection = IsqlConnection {
        isql_path: config.isql_path.clone(),
        host: config.virtuoso_host.clone(),
        port: config.virtuoso_port,
        user: config.virtuoso_user.clone(),
        password: config.virtuoso_password.clone().unwrap_or_default(),
    };
    let store = VirtuosoGraphManager::new(connection, &config.ttl_folder, &config.sql_folder)
        .with_graph_base(config.graph_base.clone())
        .with_command_attempts(config.command_attempts);
    let target = SparqlTargetInventory::new(
        SparqlClient::new(config.virtuoso_endpoint.clone()),
        config.graph_base.clone(),
    )?
    .with_rule(config.corruption_rule);
    let source = MirrorDirectory::new(&config.mirror_dir).with_attempts(config.download_attempts);

    let options = UpdaterOptions {
        node_id: server_info::server_id(),
        max_records_per_chunk: config.max_records_per_chunk,
        max_wait: config.max_wait(),
        selection: DatasetSelection::only(config.datasets.iter().cloned()),
        graph_base: config.graph_base.clone(),
        storage_location: Some(config.ttl_folder.clone()),
    };
    if !options.selection.is_all() {
        tracing::info!(datasets = ?config.datasets, "update restricted to selected datasets");
    }

    Ok(Updater::new(
        Arc::new(source) as Arc<dyn SourceInventory>,
        Arc::new(target) as Arc<dyn TargetInventory>,
        Arc::new(store) as Arc<dyn GraphStore>,
        options,
    ))
}

pub fn build_notifier(config: &UpdaterConfig) -> Arc<dyn Notifier> {
    match config.slack_webhook.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => Arc::new(SlackNotifier::new(url)),
        None => Arc::new(LogNotifier),
    }
}

/// Start the configured mode and return once it is done.
///
/// `shutdown` flipping to `true` stops a run after its current dataset.
pub async fn execute(
    config: &UpdaterConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<(), AppError> {
    config.validate().map_err(AppError::Config)?;
    prepare_folders(config)?;

    let scheduler = Arc::new(Scheduler::new(
        Arc::new(build_updater(config)?),
        build_notifier(config),
    ));

    match config.mode() {
        Mode::Run => {
            let report = scheduler.trigger(&shutdown).await?;
            match report.fatal_error() {
                Some(error) => Err(AppError::RunFailed(error.to_string())),
                None => Ok(()),
            }
        }
        Mode::Serve => {
            scheduler
                .serve(config.update_interval(), config.run_on_startup, shutdown)
                .await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(dir: &std::path::Path) -> UpdaterConfig {
        UpdaterConfig {
            virtuoso_password: Some("secret".to_string()),
            ttl_folder: dir.join("ttl"),
            sql_folder: dir.join("nested").join("sql"),
            mirror_dir: dir.join("mirror"),
            ..UpdaterConfig::default()
        }
    }

    #[test]
    fn test_prepare_folders_creates_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config(dir.path());
        prepare_folders(&config).unwrap();
        assert!(config.ttl_folder.is_dir());
        assert!(config.sql_folder.is_dir());
        // idempotent
        prepare_folders(&config).unwrap();
    }

    #[test]
    fn test_build_updater_options() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = UpdaterConfig {
            datasets: vec!["2048".to_string()],
            max_records_per_chunk: 100,
            ..config(dir.path())
        };
        let updater = build_updater(&config).unwrap();
        let options = updater.options();
        assert_eq!(options.max_records_per_chunk, 100);
        assert!(options.selection.contains("2048"));
        assert!(!options.selection.contains("9200"));
        assert_eq!(options.storage_location, Some(PathBuf::from(&config.ttl_folder)));
    }

    #[test]
    fn test_notifier_choice() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config(dir.path());
        assert!(format!("{:?}", build_notifier(&config)).contains("LogNotifier"));
        config.slack_webhook = Some("https://hooks.slack.com/services/T/B/X".to_string());
        assert!(format!("{:?}", build_notifier(&config)).contains("SlackNotifier"));
    }

    #[tokio::test]
    async fn test_run_mode_fails_when_target_cannot_be_listed() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("mirror")).unwrap();
        // no wait for the store; listing the target then fails
        let config = UpdaterConfig {
            mode: Some(Mode::Run),
            max_wait_secs: 0,
            virtuoso_endpoint: "http://127.0.0.1:1/sparql".to_string(),
            ..config(dir.path())
        };
        let (_tx, rx) = watch::channel(false);
        let err = execute(&config, rx).await.unwrap_err();
        assert!(matches!(err, AppError::RunFailed(_)));
    }
}
