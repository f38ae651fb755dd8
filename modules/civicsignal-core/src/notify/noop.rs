use async_trait::async_trait;
use tracing::debug;

use civicsignal_common::CivicError;

use crate::notification::{Channel, NotificationJob};
use crate::notify::provider::{ChannelProvider, RenderedMessage};

/// Always-succeeding provider. Stands in for channels that have no external
/// gateway (in-app) and for local development.
pub struct NoopProvider {
    channel: Channel,
}

impl NoopProvider {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelProvider for NoopProvider {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn deliver(
        &self,
        job: &NotificationJob,
        message: &RenderedMessage,
    ) -> Result<(), CivicError> {
        debug!(
            channel = %self.channel,
            notification_id = %job.id,
            title = %message.title,
            "noop delivery"
        );
        Ok(())
    }
}
