//! Completion and failure notifications.
//!
//! Delivery problems are logged and never fail the meeting being reported.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::DiscordConfig;

const ERROR_COLOR: u32 = 0xFF0000;

/// A meeting whose minutes were published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMeeting {
    pub topic: String,
    pub document_url: String,
    pub recording_url: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_success(&self, meeting: &PublishedMeeting);
    async fn notify_failure(&self, topic: &str, error: &str);
}

/// Pick the Discord notifier when a webhook is configured, otherwise one that
/// only logs.
pub fn from_config(config: &DiscordConfig) -> Result<Box<dyn Notifier>> {
    if config.webhook_url.is_empty() {
        info!("No Discord webhook configured, notifications will only be logged");
        return Ok(Box::new(LogNotifier));
    }
    Ok(Box::new(DiscordNotifier::new(&config.webhook_url)?))
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_success(&self, meeting: &PublishedMeeting) {
        info!("Minutes ready for {}: {}", meeting.topic, meeting.document_url);
    }

    async fn notify_failure(&self, topic: &str, error: &str) {
        error!("Processing failed for {}: {}", topic, error);
    }
}

pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
        })
    }

    async fn post(&self, payload: &Value) -> Result<()> {
        self.client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .context("Failed to reach Discord webhook")?
            .error_for_status()
            .context("Discord webhook rejected the message")?;
        Ok(())
    }
}

pub fn success_payload(meeting: &PublishedMeeting) -> Value {
    let mut lines = vec![
        format!("**会議文字起こし完了: {}**", meeting.topic),
        format!("議事録: {}", meeting.document_url),
    ];
    if let Some(url) = meeting.recording_url.as_deref().filter(|url| !url.is_empty()) {
        lines.push(format!("録画: {}", url));
    }
    json!({ "content": lines.join("\n") })
}

pub fn failure_payload(topic: &str, error: &str) -> Value {
    json!({
        "embeds": [{
            "title": format!("処理エラー: {}", topic),
            "description": error,
            "color": ERROR_COLOR,
        }]
    })
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify_success(&self, meeting: &PublishedMeeting) {
        match self.post(&success_payload(meeting)).await {
            Ok(()) => info!("Discord notification sent for: {}", meeting.topic),
            Err(e) => error!("Failed to send Discord notification: {:#}", e),
        }
    }

    async fn notify_failure(&self, topic: &str, error: &str) {
        match self.post(&failure_payload(topic, error)).await {
            Ok(()) => info!("Discord error notification sent for: {}", topic),
            Err(e) => error!("Failed to send Discord error notification: {:#}", e),
        }
    }
}
