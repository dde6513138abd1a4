//! Outcome of one administrative operation against the store

use std::fmt;

/// Either a success payload or a failure diagnostic, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Free-form success message (e.g. `"1200 triples"`)
    Success(String),
    /// Free-form diagnostic, typically exit code plus captured output
    Failure(String),
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        CommandResult::Success(message.into())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        CommandResult::Failure(reason.into())
    }

    /// Failure built from a process exit code and its captured output.
    pub fn exit_failure(exit_code: i32, output: &str) -> Self {
        CommandResult::Failure(format!("exit code {exit_code}: {output}"))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success(_))
    }

    /// The success message or the failure diagnostic.
    pub fn message(&self) -> &str {
        match self {
            CommandResult::Success(m) | CommandResult::Failure(m) => m,
        }
    }

    /// Run `next` only when this result is a success.
    pub async fn and_then<F, Fut>(self, next: F) -> CommandResult
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CommandResult>,
    {
        match self {
            CommandResult::Success(_) => next().await,
            failure => failure,
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Success(m) => write!(f, "success: {m}"),
            CommandResult::Failure(r) => write!(f, "failure: {r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_failure_message() {
        let r = CommandResult::exit_failure(3, "*** Error 42000");
        assert!(!r.is_success());
        assert_eq!(r.message(), "exit code 3: *** Error 42000");
    }

    #[tokio::test]
    async fn test_and_then_short_circuits() {
        let failed = CommandResult::failure("boom")
            .and_then(|| async { CommandResult::success("unreachable") })
            .await;
        assert_eq!(failed, CommandResult::failure("boom"));

        let chained = CommandResult::success("removed")
            .and_then(|| async { CommandResult::success("renamed") })
            .await;
        assert_eq!(chained.message(), "renamed");
    }
}
