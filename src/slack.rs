use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, warn};

use crate::types::SlackPayload;

/// Slack rejects section text longer than this.
pub const MAX_SECTION_CHARS: usize = 3000;

/// Delivery of the human-readable digest.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Posts digests to a Slack incoming webhook. Without a webhook URL every
/// send is skipped with a warning.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Slack HTTP client")?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let Some(url) = self.webhook_url.as_deref() else {
            warn!("SLACK_WEBHOOK_URL not set, skipping notification: {}", subject);
            return Ok(());
        };
        let payload = build_slack_payload(subject, body);
        send_to_slack(&self.client, url, &payload).await
    }
}

pub fn build_slack_payload(subject: &str, body: &str) -> SlackPayload {
    let mut blocks: Vec<serde_json::Value> = Vec::new();
    blocks.push(serde_json::json!({
        "type": "header",
        "text": {"type": "plain_text", "text": subject}
    }));
    for chunk in split_sections(body, MAX_SECTION_CHARS) {
        blocks.push(serde_json::json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": chunk}
        }));
    }
    SlackPayload {
        text: Some(subject.to_string()),
        blocks,
    }
}

/// Split on line boundaries into chunks of at most `max` chars. A single
/// line longer than `max` is cut.
fn split_sections(body: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in body.lines() {
        let mut line: String = line.to_string();
        let mut line_len = line.chars().count();
        if line_len > max {
            line = line.chars().take(max).collect();
            line_len = max;
        }
        let needed = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + needed > max && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&line);
        current_len += line_len;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

pub async fn send_to_slack(client: &reqwest::Client, webhook_url: &str, payload: &SlackPayload) -> Result<()> {
    let res = client
        .post(webhook_url)
        .json(payload)
        .send()
        .await
        .context("Failed to send Slack request")?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        error!("Slack webhook failed: {} - {}", status, body);
        return Err(anyhow!("Slack webhook returned non-success status"));
    }
    Ok(())
}
