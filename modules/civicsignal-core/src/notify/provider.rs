use async_trait::async_trait;

use civicsignal_common::CivicError;

use crate::notification::{Channel, NotificationJob};

/// The message as actually delivered, after template rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

/// Pluggable delivery backend for one channel.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    fn channel(&self) -> Channel;

    /// Deliver one rendered message. Errors are per-channel and absorbed by
    /// the dispatcher; they must not poison sibling channels.
    async fn deliver(
        &self,
        job: &NotificationJob,
        message: &RenderedMessage,
    ) -> Result<(), CivicError>;
}
