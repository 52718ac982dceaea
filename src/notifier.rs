use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::NotificationRecord;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Delivers one structured message to a chat webhook URL.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post(&self, url: &str, message: &SlackMessage) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackAttachment {
    pub color: String,
    pub fallback: String,
    pub author_name: String,
    pub author_link: String,
    pub author_icon: String,
    pub text: String,
    pub footer: String,
    pub footer_icon: String,
    pub ts: i64,
}

pub struct SlackWebhookTransport {
    client: reqwest::Client,
}

impl SlackWebhookTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatTransport for SlackWebhookTransport {
    async fn post(&self, url: &str, message: &SlackMessage) -> Result<(), TransportError> {
        let response = self.client.post(url).json(message).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

pub struct Notifier {
    transport: Arc<dyn ChatTransport>,
    webhook_url: String,
    footer: String,
}

impl Notifier {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        webhook_url: impl Into<String>,
        footer: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            webhook_url: webhook_url.into(),
            footer: footer.into(),
        }
    }

    pub fn format(&self, record: &NotificationRecord) -> SlackMessage {
        let attachment = SlackAttachment {
            color: "good".to_string(),
            fallback: format!(
                "Event GitHub Organisation{}: successfully posted by Incoming Webhook URL!",
                record.organization
            ),
            author_name: record.actor_name.clone(),
            author_link: record.actor_profile_url.clone(),
            author_icon: record.actor_avatar_url.clone(),
            text: record.message(),
            footer: self.footer.clone(),
            footer_icon: record.organization_avatar_url.clone(),
            ts: record.timestamp.timestamp(),
        };
        SlackMessage {
            attachments: vec![attachment],
        }
    }

    /// Send the alert once. Failures are logged and swallowed; the return
    /// value only reports whether the chat accepted it.
    pub async fn notify(&self, record: &NotificationRecord) -> bool {
        let message = self.format(record);
        debug!(repo = %record.repository_full_name, "sending chat notification");

        match self.transport.post(&self.webhook_url, &message).await {
            Ok(()) => {
                info!(
                    repo = %record.repository_full_name,
                    action = %record.summary.kind,
                    "chat notification sent"
                );
                true
            }
            Err(e) => {
                warn!(
                    repo = %record.repository_full_name,
                    error = %e,
                    "chat notification failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use tokio::sync::Mutex;

    /// Records every message; optionally fails each post.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<(String, SlackMessage)>>,
        pub fail: bool,
    }

    impl RecordingTransport {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::default(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn post(&self, url: &str, message: &SlackMessage) -> Result<(), TransportError> {
            self.sent
                .lock()
                .await
                .push((url.to_string(), message.clone()));
            if self.fail {
                return Err(TransportError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(())
        }
    }
}
