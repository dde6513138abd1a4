//! isql process execution
//!
//! Every administrative operation writes a scratch `.sql` file, runs
//! `isql <port> <user> <password> VERBOSE=ON|OFF <script>` and reads back the
//! exit code and combined output. The scratch file is removed when the
//! [`ScratchScript`] guard drops, whatever path the caller takes out.

use crate::error::{Result, VirtuosoError};
use sparql_updater_core::RetryPolicy;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// How to reach the store through `isql`.
#[derive(Clone)]
pub struct IsqlConnection {
    /// Path of the `isql` binary
    pub isql_path: PathBuf,
    /// Host the store listens on (liveness checks only; isql uses localhost)
    pub host: String,
    /// isql port (usually 1111)
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for IsqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsqlConnection")
            .field("isql_path", &self.isql_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Exit code and captured stdout followed by stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub output: String,
}

/// Runs isql scripts with bounded retries.
///
/// Only a process that could not be started, or that ended without an exit
/// code (killed by a signal), is retried. A non-zero exit code is returned
/// as is.
#[derive(Debug, Clone)]
pub struct IsqlExecutor {
    connection: IsqlConnection,
    retry: RetryPolicy,
}

impl IsqlExecutor {
    pub fn new(connection: IsqlConnection) -> Self {
        Self {
            connection,
            retry: RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(10)),
        }
    }

    /// Total tries per script, at least 1.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.retry = self.retry.with_attempts(attempts);
        self
    }

    pub fn connection(&self) -> &IsqlConnection {
        &self.connection
    }

    /// Run `script` and return its exit code and output.
    pub async fn run(&self, script: &Path) -> Result<ProcessOutput> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.run_once(script).await {
                Ok(Some(output)) => return Ok(output),
                Ok(None) => "process terminated by signal".to_string(),
                Err(e) => e.to_string(),
            };
            let Some(delay) = self.retry.delay_after(attempt) else {
                return Err(VirtuosoError::Command {
                    script: script.display().to_string(),
                    reason: format!("{error} (after {attempt} attempts)"),
                });
            };
            tracing::warn!(
                script = %script.display(),
                attempt,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "isql did not complete, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_once(&self, script: &Path) -> std::io::Result<Option<ProcessOutput>> {
        let verbose = if tracing::enabled!(tracing::Level::DEBUG) {
            "VERBOSE=ON"
        } else {
            "VERBOSE=OFF"
        };
        tracing::debug!(script = %script.display(), "starting isql");

        let output = Command::new(&self.connection.isql_path)
            .arg(self.connection.port.to_string())
            .arg(&self.connection.user)
            .arg(&self.connection.password)
            .arg(verbose)
            .arg(script)
            .kill_on_drop(true)
            .output()
            .await?;

        let Some(exit_code) = output.status.code() else {
            return Ok(None);
        };
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        tracing::debug!(exit_code, "isql finished");
        tracing::trace!(output = %text, "isql output");
        Ok(Some(ProcessOutput {
            exit_code,
            output: text,
        }))
    }
}

/// A script file in the scratch folder, deleted on drop.
#[derive(Debug)]
pub struct ScratchScript {
    path: PathBuf,
}

impl ScratchScript {
    pub async fn write(folder: &Path, file_name: &str, contents: &str) -> Result<Self> {
        let path = folder.join(file_name);
        tokio::fs::write(&path, contents).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchScript {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(script = %self.path.display(), "scratch script removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                script = %self.path.display(),
                error = %e,
                "could not remove scratch script"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scratch_script_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = {
            let script = ScratchScript::write(dir.path(), "1_remove.sql", "checkpoint;")
                .await
                .unwrap();
            assert_eq!(std::fs::read_to_string(script.path()).unwrap(), "checkpoint;");
            script.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let connection = IsqlConnection {
            isql_path: "/opt/virtuoso/bin/isql".into(),
            host: "localhost".into(),
            port: 1111,
            user: "dba".into(),
            password: "secret".into(),
        };
        let debug = format!("{connection:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("1111"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_binary_exhausts_attempts() {
        let dir = TempDir::new().unwrap();
        let executor = IsqlExecutor::new(IsqlConnection {
            isql_path: dir.path().join("no-such-isql"),
            host: "localhost".into(),
            port: 1111,
            user: "dba".into(),
            password: "dba".into(),
        })
        .with_attempts(2);

        let err = executor.run(&dir.path().join("x.sql")).await.unwrap_err();
        match err {
            VirtuosoError::Command { reason, .. } => assert!(reason.ends_with("(after 2 attempts)")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
