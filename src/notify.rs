//! Chat notifications via a Discord-compatible incoming webhook.
//!
//! Best effort: a missing URL or a failed post is logged and reported as
//! `false`, never as an error.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;

const RETRY_DELAYS_MS: &[u64] = &[100, 200];

/// Embed colors
pub mod color {
    pub const SUCCESS: u32 = 0x2ecc71;
    pub const WARNING: u32 = 0xf39c12;
    pub const ERROR: u32 = 0xe74c3c;
    pub const INFO: u32 = 0x3498db;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

impl Embed {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: Some(title.into()),
            color: Some(color),
            timestamp: Some(Utc::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn inline_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }
}

impl From<Embed> for ChatMessage {
    fn from(embed: Embed) -> Self {
        ChatMessage {
            content: None,
            embeds: vec![embed],
        }
    }
}

pub struct ChatNotifier {
    webhook_url: Option<String>,
    http_client: Client,
}

impl ChatNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            http_client: Client::new(),
        }
    }

    /// Post `message`. Returns whether the webhook accepted it.
    pub async fn send(&self, message: impl Into<ChatMessage>) -> bool {
        let Some(url) = self.webhook_url.as_deref() else {
            tracing::warn!("DISCORD_WEBHOOK_URL not configured, skipping chat notification");
            return false;
        };
        let message = message.into();

        for (attempt, delay_ms) in std::iter::once(&0u64).chain(RETRY_DELAYS_MS).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
            }

            match self
                .http_client
                .post(url)
                .json(&message)
                .timeout(Duration::from_secs(5))
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    if attempt > 0 {
                        tracing::debug!("Chat webhook succeeded after {} retries", attempt);
                    }
                    return true;
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    tracing::debug!(status = %status, body = %body, "Chat webhook rejected message");
                }
                Err(e) => {
                    tracing::debug!("Chat webhook failed: {}", e);
                }
            }
        }

        tracing::warn!(
            "Chat webhook failed after {} attempts",
            RETRY_DELAYS_MS.len() + 1
        );
        false
    }
}
