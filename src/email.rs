//! Outbound email via a SendGrid-compatible HTTP API.
//!
//! A send succeeds only on `202 Accepted`; the message id comes back in the
//! `x-message-id` header. Rate limiting (429) and 5xx responses are retried
//! with backoff, everything else fails immediately.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// Delays before each retry, in seconds
const RETRY_DELAYS: &[u64] = &[1, 4, 16];

pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SENDGRID_API_KEY not configured")]
    NotConfigured,

    #[error("{0}")]
    Transport(String),

    #[error("{status}: {body}")]
    Rejected { status: u16, body: String },
}

impl EmailError {
    fn is_transient(&self) -> bool {
        match self {
            EmailError::NotConfigured => false,
            EmailError::Transport(_) => true,
            EmailError::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
        }
    }
}

/// A rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: [SendGridPersonalization<'a>; 1],
    from: SendGridAddress<'a>,
    subject: &'a str,
    content: [SendGridContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization<'a> {
    to: [SendGridAddress<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SendGridAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

pub struct EmailService {
    api_key: Option<String>,
    from_email: String,
    from_name: String,
    api_url: String,
    http_client: Client,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from_email: String, from_name: String) -> Self {
        Self {
            api_key,
            from_email,
            from_name,
            api_url: SENDGRID_API_URL.to_string(),
            http_client: Client::new(),
        }
    }

    /// Point the service at a different endpoint (tests, proxies).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send `message` to `to`. Returns the provider's message id, if it gave one.
    pub async fn send(&self, to: &str, message: &EmailMessage) -> Result<Option<String>, EmailError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(to = %to, "No SendGrid API key configured, cannot send email");
            return Err(EmailError::NotConfigured);
        };

        let request = SendGridRequest {
            personalizations: [SendGridPersonalization {
                to: [SendGridAddress {
                    email: to,
                    name: None,
                }],
            }],
            from: SendGridAddress {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            subject: &message.subject,
            content: [SendGridContent {
                content_type: "text/plain",
                value: &message.body,
            }],
        };

        let mut last_error: Option<EmailError> = None;

        for (attempt, delay_secs) in std::iter::once(&0u64).chain(RETRY_DELAYS).enumerate() {
            if *delay_secs > 0 {
                tracing::warn!(attempt, delay_secs, "Retrying email send after transient failure");
                tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
            }

            match self.send_request(api_key, &request).await {
                Ok(message_id) => {
                    tracing::info!(
                        to = %to,
                        subject = %message.subject,
                        message_id = ?message_id,
                        attempt,
                        "Email sent"
                    );
                    return Ok(message_id);
                }
                Err(error) if error.is_transient() => last_error = Some(error),
                Err(error) => return Err(error),
            }
        }

        tracing::error!(
            to = %to,
            attempts = RETRY_DELAYS.len() + 1,
            "Email send failed after all retries"
        );
        Err(last_error.unwrap_or_else(|| EmailError::Transport("all retries exhausted".into())))
    }

    async fn send_request(
        &self,
        api_key: &str,
        request: &SendGridRequest<'_>,
    ) -> Result<Option<String>, EmailError> {
        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send request to SendGrid API");
                EmailError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            return Ok(message_id);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let error = EmailError::Rejected {
            status: status.as_u16(),
            body,
        };
        if error.is_transient() {
            tracing::warn!(status = %status, error = %error, "SendGrid API returned transient error");
        } else {
            tracing::error!(status = %status, error = %error, "SendGrid API returned non-transient error");
        }
        Err(error)
    }
}
