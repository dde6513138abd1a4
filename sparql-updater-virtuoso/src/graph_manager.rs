//! Dataset-level graph operations
//!
//! [`GraphStore`] is what the updater drives; [`VirtuosoGraphManager`]
//! implements it by rendering an isql script per operation and classifying
//! the process result into a [`CommandResult`].

use crate::error::{Result, VirtuosoError};
use crate::executor::{IsqlConnection, IsqlExecutor, ProcessOutput, ScratchScript};
use crate::template::IsqlTemplate;
use async_trait::async_trait;
use regex::Regex;
use sparql_updater_core::{vocab, CommandResult};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::net::TcpStream;

/// Connect timeout of a single liveness check.
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);
/// Default pause between liveness checks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

fn load_error() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"LOAD_ERROR (.+)").expect("static regex"))
}

fn success_triples() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Result triples:\s+(\d+)").expect("static regex"))
}

/// Administrative operations on dataset graphs.
///
/// Operations return `Ok(CommandResult)` once the store answered, whether
/// the answer is a success or a failure; `Err` means the operation could not
/// be carried out at all (scratch I/O, isql not runnable).
#[async_trait]
pub trait GraphStore: Debug + Send + Sync {
    /// Folder the load file `<id>.ttl.gz` must be written to before
    /// [`GraphStore::ingest_chunk`].
    fn import_folder(&self) -> &Path;

    /// Load `<import>/<id>.ttl.gz` into `graph_id` (usually a temp graph).
    async fn ingest_chunk(&self, graph_id: &str) -> Result<CommandResult>;

    /// Drop the final graph of a dataset. Absence is not an error.
    async fn remove_graph(&self, dataset_id: &str) -> Result<CommandResult>;

    /// Drop the temp graph of a dataset. Absence is not an error.
    async fn remove_temp_graph(&self, dataset_id: &str) -> Result<CommandResult>;

    /// Give the temp graph of a dataset its final name.
    async fn rename_temp_to_final(&self, dataset_id: &str) -> Result<CommandResult>;

    /// Single liveness check.
    async fn is_reachable(&self) -> bool;

    /// Pause between checks in [`GraphStore::wait_until_reachable`].
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Poll [`GraphStore::is_reachable`] until it succeeds or `max_wait`
    /// has elapsed.
    async fn wait_until_reachable(&self, max_wait: Duration) -> Result<()> {
        let start = tokio::time::Instant::now();
        tracing::info!(max_wait_secs = max_wait.as_secs(), "checking if Virtuoso is available");
        loop {
            if self.is_reachable().await {
                return Ok(());
            }
            if start.elapsed() >= max_wait {
                return Err(VirtuosoError::NotReady {
                    waited_secs: max_wait.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }
}

/// [`GraphStore`] backed by Virtuoso's `isql` tool.
#[derive(Debug)]
pub struct VirtuosoGraphManager {
    executor: IsqlExecutor,
    templates: IsqlTemplate,
    import_folder: PathBuf,
    sql_folder: PathBuf,
    poll_interval: Duration,
}

impl VirtuosoGraphManager {
    /// `import_folder` receives load files, `sql_folder` scratch scripts.
    pub fn new(
        connection: IsqlConnection,
        import_folder: impl Into<PathBuf>,
        sql_folder: impl Into<PathBuf>,
    ) -> Self {
        let import_folder = import_folder.into();
        Self {
            executor: IsqlExecutor::new(connection),
            templates: IsqlTemplate::new(import_folder.clone(), vocab::DEFAULT_GRAPH_BASE),
            import_folder,
            sql_folder: sql_folder.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_graph_base(mut self, graph_base: impl Into<String>) -> Self {
        self.templates = IsqlTemplate::new(self.import_folder.clone(), graph_base);
        self
    }

    pub fn with_command_attempts(mut self, attempts: u32) -> Self {
        self.executor = self.executor.with_attempts(attempts);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn run_script(&self, file_name: &str, contents: &str) -> Result<ProcessOutput> {
        let script = ScratchScript::write(&self.sql_folder, file_name, contents).await?;
        self.executor.run(script.path()).await
    }

    async fn remove(&self, dataset_id: &str, temp: bool) -> Result<CommandResult> {
        tracing::debug!(dataset = %dataset_id, temp, "removing graph");
        let script = self.templates.remove(dataset_id, temp);
        let out = self
            .run_script(&format!("{dataset_id}_remove.sql"), &script)
            .await?;
        Ok(classify_admin(out, "Removal successful"))
    }
}

#[async_trait]
impl GraphStore for VirtuosoGraphManager {
    fn import_folder(&self) -> &Path {
        &self.import_folder
    }

    async fn ingest_chunk(&self, graph_id: &str) -> Result<CommandResult> {
        tracing::debug!(graph = %graph_id, "ingesting chunk");
        let script = self.templates.create_update(graph_id);
        let out = self
            .run_script(&format!("{graph_id}_create_update.sql"), &script)
            .await?;
        Ok(classify_ingest(out))
    }

    async fn remove_graph(&self, dataset_id: &str) -> Result<CommandResult> {
        self.remove(dataset_id, false).await
    }

    async fn remove_temp_graph(&self, dataset_id: &str) -> Result<CommandResult> {
        self.remove(dataset_id, true).await
    }

    async fn rename_temp_to_final(&self, dataset_id: &str) -> Result<CommandResult> {
        tracing::debug!(dataset = %dataset_id, "renaming temp graph");
        let script = self.templates.rename(dataset_id);
        let out = self
            .run_script(&format!("{dataset_id}_rename.sql"), &script)
            .await?;
        Ok(classify_admin(out, "Rename successful"))
    }

    async fn is_reachable(&self) -> bool {
        let conn = self.executor.connection();
        let addr = (conn.host.as_str(), conn.port);
        matches!(
            tokio::time::timeout(LIVENESS_TIMEOUT, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Interpret the output of a create/update script.
///
/// The triple count covers the whole graph, chunks loaded earlier included,
/// so a load error reported by the bulk loader fails the chunk regardless of
/// the count.
pub fn classify_ingest(out: ProcessOutput) -> CommandResult {
    if out.exit_code != 0 {
        return CommandResult::exit_failure(out.exit_code, &out.output);
    }
    if let Some(error) = load_error().captures(&out.output).and_then(|c| c.get(1)) {
        return CommandResult::failure(format!(
            "Load error: {}. Output:\n{}",
            error.as_str().trim(),
            out.output
        ));
    }
    let Some(count) = success_triples()
        .captures(&out.output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return CommandResult::failure(format!("Triples not found: {}", out.output));
    };
    if count.trim_start_matches('0').is_empty() {
        return CommandResult::failure(format!("Empty dataset. Output:\n{}", out.output));
    }
    CommandResult::success(format!("{count} triples"))
}

/// Interpret the output of a rename or remove script.
pub fn classify_admin(out: ProcessOutput, success: &str) -> CommandResult {
    if out.exit_code == 0 {
        CommandResult::success(success)
    } else {
        CommandResult::exit_failure(out.exit_code, &out.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(exit_code: i32, output: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code,
            output: output.to_string(),
        }
    }

    #[test]
    fn test_classify_ingest() {
        assert_eq!(
            classify_ingest(out(0, "result\nResult triples:   1200\n1 Rows.")),
            CommandResult::success("1200 triples")
        );
        assert_eq!(
            classify_ingest(out(0, "Result triples: 0")),
            CommandResult::failure("Empty dataset. Output:\nResult triples: 0")
        );
        assert_eq!(
            classify_ingest(out(0, "Done.")),
            CommandResult::failure("Triples not found: Done.")
        );
        assert_eq!(
            classify_ingest(out(0, "LOAD_ERROR 37000 SP029: TURTLE RDF loader, line 3: syntax error\nResult triples: 40")),
            CommandResult::failure(
                "Load error: 37000 SP029: TURTLE RDF loader, line 3: syntax error. Output:\n\
                 LOAD_ERROR 37000 SP029: TURTLE RDF loader, line 3: syntax error\nResult triples: 40"
            )
        );
        assert_eq!(
            classify_ingest(out(2, "Result triples: 5\n*** Error S2801")),
            CommandResult::failure("exit code 2: Result triples: 5\n*** Error S2801")
        );
    }

    #[test]
    fn test_classify_admin() {
        assert!(classify_admin(out(0, ""), "Removal successful").is_success());
        assert_eq!(
            classify_admin(out(1, "*** Error 42000"), "Removal successful"),
            CommandResult::failure("exit code 1: *** Error 42000")
        );
    }

    #[tokio::test]
    async fn test_unreachable_port() {
        // bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let manager = VirtuosoGraphManager::new(
            IsqlConnection {
                isql_path: "isql".into(),
                host: "127.0.0.1".into(),
                port,
                user: "dba".into(),
                password: "dba".into(),
            },
            "/tmp",
            "/tmp",
        );
        assert!(!manager.is_reachable().await);
    }

    #[tokio::test]
    async fn test_reachable_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let manager = VirtuosoGraphManager::new(
            IsqlConnection {
                isql_path: "isql".into(),
                host: "127.0.0.1".into(),
                port,
                user: "dba".into(),
                password: "dba".into(),
            },
            "/tmp",
            "/tmp",
        );
        assert!(manager.is_reachable().await);
        manager
            .wait_until_reachable(Duration::from_secs(1))
            .await
            .unwrap();
    }
}
