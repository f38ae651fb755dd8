use std::sync::Arc;

use async_graphql::*;
use chrono::Utc;
use uuid::Uuid;

use civicsignal_common::{CivicError, Language, Priority};
use civicsignal_core::notification::{
    Channel, NotificationDraft, NotificationKind, NotificationPayload,
};

use crate::graphql::context;
use crate::graphql::error;
use crate::ApiDeps;

use super::types::GqlNotification;

#[derive(InputObject)]
pub struct BulkNotificationInput {
    pub recipients: Vec<Uuid>,
    pub kind: String,
    pub title: String,
    pub body: String,
    /// push, sms, email, voice or in_app
    pub channels: Vec<String>,
    pub priority: Option<String>,
    pub language: Option<String>,
    pub issue_id: Option<Uuid>,
}

#[derive(SimpleObject)]
pub struct BulkNotificationResult {
    pub sent: u64,
    pub failed: u64,
}

#[derive(Default)]
pub struct NotificationMutation;

#[Object]
impl NotificationMutation {
    /// Mark one of the caller's notifications as read.
    async fn mark_notification_read(&self, ctx: &Context<'_>, id: Uuid) -> Result<GqlNotification> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;

        let mut job = deps
            .notifications
            .get(id)
            .await
            .map_err(error::from_civic)?
            .ok_or_else(|| error::from_civic(CivicError::NotFound(format!("notification {id}"))))?;
        if job.recipient != actor.user_id {
            return Err(error::from_civic(CivicError::Forbidden(
                "not your notification".into(),
            )));
        }

        job.mark_read(Utc::now());
        deps.notifications.update(job.clone()).await.map_err(error::from_civic)?;
        Ok(GqlNotification::from(job))
    }

    /// Mark everything unread as read. Returns how many changed.
    async fn mark_all_notifications_read(&self, ctx: &Context<'_>) -> Result<u64> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        deps.notifications
            .mark_all_read(actor.user_id, Utc::now())
            .await
            .map_err(error::from_civic)
    }

    /// Delete one of the caller's notifications, whatever its state.
    async fn delete_notification(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;

        let job = deps
            .notifications
            .get(id)
            .await
            .map_err(error::from_civic)?
            .ok_or_else(|| error::from_civic(CivicError::NotFound(format!("notification {id}"))))?;
        if job.recipient != actor.user_id {
            return Err(error::from_civic(CivicError::Forbidden(
                "not your notification".into(),
            )));
        }

        deps.notifications.delete(id).await.map_err(error::from_civic)
    }

    /// Cancel a scheduled notification that has not been claimed yet.
    /// Returns false once dispatch has started.
    async fn cancel_scheduled_notification(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;

        let job = deps
            .notifications
            .get(id)
            .await
            .map_err(error::from_civic)?
            .ok_or_else(|| error::from_civic(CivicError::NotFound(format!("notification {id}"))))?;
        if job.recipient != actor.user_id && !actor.role.can_manage_issues() {
            return Err(error::from_civic(CivicError::Forbidden(
                "not your notification".into(),
            )));
        }

        deps.notifications.cancel(id).await.map_err(error::from_civic)
    }

    /// Broadcast one notification per recipient. Officials only. Partial
    /// failure is reported in the counts.
    async fn send_bulk_notification(
        &self,
        ctx: &Context<'_>,
        input: BulkNotificationInput,
    ) -> Result<BulkNotificationResult> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        if !actor.role.can_manage_issues() {
            return Err(error::from_civic(CivicError::Forbidden(
                "only officials can send bulk notifications".into(),
            )));
        }
        tracing::info!(
            sender = %actor.user_id,
            recipients = input.recipients.len(),
            "graphql.send_bulk_notification"
        );

        let channels = input
            .channels
            .iter()
            .map(|c| Channel::parse(c))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(error::from_civic)?;
        let draft = NotificationDraft {
            recipient: actor.user_id,
            sender: Some(actor.user_id),
            kind: NotificationKind::parse(&input.kind).map_err(error::from_civic)?,
            title: input.title,
            body: input.body,
            payload: input.issue_id.map(|issue_id| NotificationPayload {
                issue_id: Some(issue_id),
                ..Default::default()
            }),
            channels,
            priority: input
                .priority
                .as_deref()
                .map(Priority::parse)
                .transpose()
                .map_err(error::from_civic)?
                .unwrap_or(Priority::Medium),
            language: input
                .language
                .as_deref()
                .map(Language::from_str_loose)
                .unwrap_or_default(),
            scheduled_for: None,
        };

        let outcome = deps
            .dispatcher
            .send_bulk(&input.recipients, draft)
            .await
            .map_err(error::from_civic)?;
        Ok(BulkNotificationResult { sent: outcome.sent, failed: outcome.failed })
    }
}
