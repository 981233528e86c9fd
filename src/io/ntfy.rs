//! ntfy push notification sender
//!
//! Publishes with ntfy's JSON API: `POST {server}` with
//! `{"topic", "message", "title", "attach"}`. Media references in the payload
//! are turned into Frigate API URLs here.

use crate::domain::notification::{Attachment, MediaKind, NotificationPayload};
use crate::infra::config::Config;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("ntfy request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ntfy server responded with status {0}")]
    Status(u16),
    #[error("failed to encode ntfy message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl NotifyError {
    /// Transport errors, 5xx and 429 may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Transport(_) => true,
            NotifyError::Status(status) => *status >= 500 || *status == 429,
            NotifyError::Encode(_) => false,
        }
    }
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

/// Builds Frigate media URLs for an event
#[derive(Debug, Clone)]
pub struct MediaUrls {
    base_url: String,
}

impl MediaUrls {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn url_for(&self, attachment: &Attachment) -> String {
        let file = match attachment.kind {
            MediaKind::Snapshot => "snapshot.jpg",
            MediaKind::Clip => "clip.mp4",
        };
        format!("{}/api/events/{}/{}", self.base_url, attachment.object_id, file)
    }
}

#[derive(Debug, Serialize)]
struct NtfyMessage<'a> {
    topic: &'a str,
    message: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attach: Option<String>,
}

pub struct NtfyClient {
    http_client: reqwest::Client,
    server_url: String,
    topic: String,
    /// Precomputed `Authorization` header value
    auth_header: Option<String>,
    media_urls: MediaUrls,
}

impl NtfyClient {
    pub fn new(config: &Config) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            server_url: config.ntfy_server_url().trim_end_matches('/').to_string(),
            topic: config.ntfy_topic().to_string(),
            auth_header: basic_auth_header(config.ntfy_username(), config.ntfy_password()),
            media_urls: MediaUrls::new(config.frigate_base_url()),
        })
    }

    fn encode(&self, payload: &NotificationPayload) -> Result<Vec<u8>, NotifyError> {
        let message = NtfyMessage {
            topic: &self.topic,
            message: &payload.body,
            title: &payload.title,
            attach: payload.attachment.as_ref().map(|a| self.media_urls.url_for(a)),
        };
        Ok(serde_json::to_vec(&message)?)
    }
}

#[async_trait]
impl Notifier for NtfyClient {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let body = self.encode(payload)?;

        let mut request = self
            .http_client
            .post(&self.server_url)
            .header("Content-Type", "application/json")
            .body(body);

        if let Some(ref auth) = self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Basic auth is only used when both username and password are set
fn basic_auth_header(username: Option<&str>, password: Option<&str>) -> Option<String> {
    match (username, password) {
        (Some(username), Some(password)) => {
            let credentials = format!("{}:{}", username, password);
            Some(format!("Basic {}", STANDARD.encode(credentials.as_bytes())))
        }
        _ => None,
    }
}
