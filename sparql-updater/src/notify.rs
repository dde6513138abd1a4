//! Publishing run reports

use crate::error::{Result, UpdaterError};
use async_trait::async_trait;
use sparql_updater_core::UpdateReport;
use std::fmt::Debug;

/// Receives the report of every finished run.
#[async_trait]
pub trait Notifier: Debug + Send + Sync {
    async fn publish(&self, report: &UpdateReport) -> Result<()>;
}

/// Posts the report summary to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

/// Slack message body for a report.
pub fn slack_message(report: &UpdateReport) -> serde_json::Value {
    serde_json::json!({ "text": report.summary() })
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn publish(&self, report: &UpdateReport) -> Result<()> {
        tracing::info!("Sending report to Slack...");
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&slack_message(report))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(UpdaterError::Notify(format!(
                "Slack returned status {}",
                resp.status()
            )));
        }
        tracing::debug!("report sent to Slack");
        Ok(())
    }
}

/// Used when no webhook is configured; the summary is only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, _report: &UpdateReport) -> Result<()> {
        tracing::info!("No report sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_message_wraps_summary() {
        let mut report = UpdateReport::new("node-1", None, 0);
        report.finish();
        let message = slack_message(&report);
        assert_eq!(message["text"].as_str(), Some(report.summary().as_str()));
    }
}
