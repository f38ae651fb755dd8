//! HTTP gateway providers for push and SMS delivery.

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use civicsignal_common::CivicError;

use crate::notification::{Channel, NotificationJob};
use crate::notify::provider::{ChannelProvider, RenderedMessage};

async fn post_json(
    http: &reqwest::Client,
    url: &str,
    payload: serde_json::Value,
    channel: Channel,
) -> Result<(), CivicError> {
    let resp = http
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| CivicError::Delivery(format!("{channel}: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        warn!(channel = %channel, status = %status, body = %body, "gateway returned non-success");
        return Err(CivicError::Delivery(format!("{channel}: gateway returned {status}")));
    }

    Ok(())
}

/// Push delivery via an HTTP gateway that resolves recipient ids to device
/// tokens upstream.
pub struct PushGateway {
    url: String,
    http: reqwest::Client,
}

impl PushGateway {
    pub fn new(url: String) -> Self {
        Self { url, http: reqwest::Client::new() }
    }
}

#[async_trait]
impl ChannelProvider for PushGateway {
    fn channel(&self) -> Channel {
        Channel::Push
    }

    async fn deliver(
        &self,
        job: &NotificationJob,
        message: &RenderedMessage,
    ) -> Result<(), CivicError> {
        let payload = json!({
            "to": job.recipient,
            "title": message.title,
            "body": message.body,
            "priority": job.priority.as_str(),
            "data": {
                "kind": job.kind.as_str(),
                "issue_id": job.payload.as_ref().and_then(|p| p.issue_id),
            },
        });
        post_json(&self.http, &self.url, payload, Channel::Push).await
    }
}

/// SMS delivery via a text gateway.
pub struct SmsGateway {
    url: String,
    sender_id: String,
    http: reqwest::Client,
}

impl SmsGateway {
    pub fn new(url: String, sender_id: String) -> Self {
        Self { url, sender_id, http: reqwest::Client::new() }
    }
}

#[async_trait]
impl ChannelProvider for SmsGateway {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn deliver(
        &self,
        job: &NotificationJob,
        message: &RenderedMessage,
    ) -> Result<(), CivicError> {
        let payload = json!({
            "sender": self.sender_id,
            "recipient": job.recipient,
            "message": message.body,
        });
        post_json(&self.http, &self.url, payload, Channel::Sms).await
    }
}
