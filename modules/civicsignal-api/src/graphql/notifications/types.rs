use async_graphql::*;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use civicsignal_core::notification::{NotificationJob, NotificationPayload};
use civicsignal_core::pagination::Connection as CoreConnection;

use crate::graphql::issues::types::GqlPageInfo;

#[derive(SimpleObject, Clone)]
pub struct GqlNotification {
    pub id: Uuid,
    pub recipient: Uuid,
    pub sender: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub payload: Option<GqlNotificationPayload>,
    pub channels: Vec<String>,
    pub priority: String,
    pub language: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub delivery_attempts: u32,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationJob> for GqlNotification {
    fn from(job: NotificationJob) -> Self {
        Self {
            id: job.id,
            recipient: job.recipient,
            sender: job.sender,
            kind: job.kind.to_string(),
            title: job.title,
            body: job.body,
            payload: job.payload.map(GqlNotificationPayload::from),
            channels: job.channels.iter().map(|c| c.to_string()).collect(),
            priority: job.priority.to_string(),
            language: job.language.to_string(),
            scheduled_for: job.scheduled_for,
            status: job.status.to_string(),
            sent_at: job.sent_at,
            delivered_at: job.delivered_at,
            read_at: job.read_at,
            is_read: job.is_read,
            delivery_attempts: job.delivery_attempts,
            failure_reason: job.failure_reason,
            created_at: job.created_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GqlNotificationPayload {
    pub issue_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub action_url: Option<String>,
    pub issue_status: Option<String>,
}

impl From<NotificationPayload> for GqlNotificationPayload {
    fn from(payload: NotificationPayload) -> Self {
        Self {
            issue_id: payload.issue_id,
            comment_id: payload.comment_id,
            action_url: payload.action_url,
            issue_status: payload.issue_status.map(|s| s.to_string()),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlNotificationEdge {
    pub node: GqlNotification,
    pub cursor: String,
}

#[derive(SimpleObject)]
pub struct GqlNotificationConnection {
    pub edges: Vec<GqlNotificationEdge>,
    pub page_info: GqlPageInfo,
}

impl From<CoreConnection<NotificationJob>> for GqlNotificationConnection {
    fn from(conn: CoreConnection<NotificationJob>) -> Self {
        Self {
            edges: conn
                .edges
                .into_iter()
                .map(|edge| GqlNotificationEdge {
                    node: GqlNotification::from(edge.node),
                    cursor: edge.cursor,
                })
                .collect(),
            page_info: GqlPageInfo::from(conn.page_info),
        }
    }
}
