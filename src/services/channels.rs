// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Delivery channel adapters.
//!
//! Push and email go out over HTTP to an external gateway; in-app delivery
//! is the inbox itself plus a best-effort realtime nudge. Each adapter
//! succeeds or fails on its own; the scheduler decides what a mix of
//! outcomes means.

use crate::config::Config;
use crate::db::MemoryDb;
use crate::models::{EventPayload, Notification, RealtimeEvent};
use crate::services::event_bus::EventBus;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "X-Pulse-Signature";

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("{0} adapter is not configured")]
    NotConfigured(&'static str),

    #[error("Notification {0} is no longer stored")]
    Missing(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to sign request: {0}")]
    Signing(String),
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: &Value,
    ) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        user_id: &str,
        subject: &str,
        body: &str,
        action_url: Option<&str>,
    ) -> Result<(), ChannelError>;
}

/// Hex HMAC-SHA256 of `body` under `key`.
pub fn sign(key: &[u8], body: &[u8]) -> Result<String, ChannelError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| ChannelError::Signing(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// JSON POST to a fixed endpoint, optionally signed.
struct SignedPoster {
    name: &'static str,
    http: reqwest::Client,
    url: Option<String>,
    signing_key: Option<Vec<u8>>,
    timeout: Duration,
}

impl SignedPoster {
    fn new(
        name: &'static str,
        url: Option<String>,
        signing_key: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            http: reqwest::Client::new(),
            url,
            signing_key,
            timeout,
        }
    }

    async fn post(&self, payload: &Value) -> Result<(), ChannelError> {
        let url = self
            .url
            .as_deref()
            .ok_or(ChannelError::NotConfigured(self.name))?;
        let body = serde_json::to_vec(payload)?;

        let mut request = self
            .http
            .post(url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json");
        if let Some(key) = &self.signing_key {
            request = request.header(SIGNATURE_HEADER, sign(key, &body)?);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(adapter = self.name, "Gateway accepted request");
        Ok(())
    }
}

pub struct HttpPushSender {
    poster: SignedPoster,
}

impl HttpPushSender {
    pub fn new(url: Option<String>, signing_key: Option<Vec<u8>>, timeout: Duration) -> Self {
        Self {
            poster: SignedPoster::new("push", url, signing_key, timeout),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.push_gateway_url.clone(),
            config.outbound_signing_key.clone(),
            config.channel_timeout,
        )
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: &Value,
    ) -> Result<(), ChannelError> {
        self.poster
            .post(&json!({
                "user_id": user_id,
                "title": title,
                "body": body,
                "data": data,
            }))
            .await
    }
}

pub struct HttpEmailSender {
    poster: SignedPoster,
}

impl HttpEmailSender {
    pub fn new(url: Option<String>, signing_key: Option<Vec<u8>>, timeout: Duration) -> Self {
        Self {
            poster: SignedPoster::new("email", url, signing_key, timeout),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.email_relay_url.clone(),
            config.outbound_signing_key.clone(),
            config.channel_timeout,
        )
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(
        &self,
        user_id: &str,
        subject: &str,
        body: &str,
        action_url: Option<&str>,
    ) -> Result<(), ChannelError> {
        self.poster
            .post(&json!({
                "user_id": user_id,
                "subject": subject,
                "body": body,
                "action_url": action_url,
            }))
            .await
    }
}

/// In-app delivery.
///
/// The stored notification is what the user sees in their inbox, so the
/// channel succeeds as long as the record still exists. A live connection,
/// if any, also gets a `notification` event.
pub struct InAppChannel {
    db: MemoryDb,
    bus: Arc<EventBus>,
}

impl InAppChannel {
    pub fn new(db: MemoryDb, bus: Arc<EventBus>) -> Self {
        Self { db, bus }
    }

    pub fn deliver(&self, notification: &Notification) -> Result<(), ChannelError> {
        if self.db.get_notification(&notification.id).is_none() {
            return Err(ChannelError::Missing(notification.id.clone()));
        }

        let pushed = self.bus.send_to_user(
            &notification.user_id,
            &RealtimeEvent::new(
                notification.user_id.as_str(),
                EventPayload::Notification {
                    notification: notification.clone(),
                },
            ),
        );
        tracing::debug!(notification_id = %notification.id, pushed, "In-app delivery");
        Ok(())
    }
}
