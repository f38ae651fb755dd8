pub mod mutations;
pub mod types;

use std::sync::Arc;

use async_graphql::*;

use civicsignal_core::notification::NotificationKind;
use civicsignal_core::pagination::{Connection as CoreConnection, PageRequest};
use civicsignal_core::store::NotificationFilter;

use civicsignal_common::CivicError;
use uuid::Uuid;

use crate::graphql::context;
use crate::graphql::error;
use crate::ApiDeps;
use types::{GqlNotification, GqlNotificationConnection};

#[derive(Default)]
pub struct NotificationQuery;

#[Object]
impl NotificationQuery {
    /// The caller's notifications, newest first.
    #[graphql(complexity = "first.unwrap_or(20) as usize * child_complexity + 1")]
    async fn notifications(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        first: Option<i32>,
        unread_only: Option<bool>,
        kind: Option<String>,
    ) -> Result<GqlNotificationConnection> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        tracing::info!(recipient = %actor.user_id, "graphql.notifications");

        let filter = NotificationFilter {
            recipient: Some(actor.user_id),
            kind: kind
                .as_deref()
                .map(NotificationKind::parse)
                .transpose()
                .map_err(error::from_civic)?,
            unread_only: unread_only.unwrap_or(false),
            ..Default::default()
        };

        let request = PageRequest::from_args(first, after.as_deref()).map_err(error::from_civic)?;
        let window = deps
            .notifications
            .list(&filter, request.offset, request.fetch_limit())
            .await
            .map_err(error::from_civic)?;
        let total = deps.notifications.count(&filter).await.map_err(error::from_civic)?;

        Ok(GqlNotificationConnection::from(CoreConnection::from_window(
            window, request, total,
        )))
    }

    /// Fetch one of the caller's notifications. Other users' notifications
    /// come back as not found.
    async fn notification(&self, ctx: &Context<'_>, id: Uuid) -> Result<GqlNotification> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;

        let job = deps
            .notifications
            .get(id)
            .await
            .map_err(error::from_civic)?
            .filter(|job| job.recipient == actor.user_id)
            .ok_or_else(|| error::from_civic(CivicError::NotFound(format!("notification {id}"))))?;
        Ok(GqlNotification::from(job))
    }

    /// How many of the caller's notifications are unread.
    async fn unread_notification_count(&self, ctx: &Context<'_>) -> Result<u64> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        deps.notifications
            .unread_count(actor.user_id)
            .await
            .map_err(error::from_civic)
    }
}
