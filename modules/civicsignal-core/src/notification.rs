//! Outbound notification jobs and their delivery state machine.
//!
//! Delivery state: pending -> sent -> delivered -> read, or pending -> failed.
//! `is_read`/`read_at` are a read-projection independent of channel delivery;
//! delivery confirmation is best-effort and must never block read-tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use civicsignal_common::{CivicError, IssueStatus, Language, Priority};

const MAX_TITLE_LEN: usize = 100;
const MAX_BODY_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    IssueUpdate,
    IssueResolved,
    CommentReply,
    SystemAlert,
    FeedbackRequest,
    Assignment,
    UrgentAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::IssueUpdate => "issue_update",
            NotificationKind::IssueResolved => "issue_resolved",
            NotificationKind::CommentReply => "comment_reply",
            NotificationKind::SystemAlert => "system_alert",
            NotificationKind::FeedbackRequest => "feedback_request",
            NotificationKind::Assignment => "assignment",
            NotificationKind::UrgentAlert => "urgent_alert",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CivicError> {
        match s.to_lowercase().as_str() {
            "issue_update" => Ok(NotificationKind::IssueUpdate),
            "issue_resolved" => Ok(NotificationKind::IssueResolved),
            "comment_reply" => Ok(NotificationKind::CommentReply),
            "system_alert" => Ok(NotificationKind::SystemAlert),
            "feedback_request" => Ok(NotificationKind::FeedbackRequest),
            "assignment" => Ok(NotificationKind::Assignment),
            "urgent_alert" => Ok(NotificationKind::UrgentAlert),
            other => Err(CivicError::Validation(format!(
                "unknown notification kind: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Push,
    Sms,
    Email,
    Voice,
    InApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => "push",
            Channel::Sms => "sms",
            Channel::Email => "email",
            Channel::Voice => "voice",
            Channel::InApp => "in_app",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CivicError> {
        match s.to_lowercase().as_str() {
            "push" => Ok(Channel::Push),
            "sms" => Ok(Channel::Sms),
            "email" => Ok(Channel::Email),
            "voice" => Ok(Channel::Voice),
            "in_app" => Ok(Channel::InApp),
            other => Err(CivicError::Validation(format!("unknown channel: {other}"))),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CivicError> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "read" => Ok(DeliveryStatus::Read),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(CivicError::Validation(format!(
                "unknown delivery status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured payload rendered into templates and surfaced to clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub issue_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub action_url: Option<String>,
    pub issue_status: Option<IssueStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub id: Uuid,
    pub recipient: Uuid,
    pub sender: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: Option<NotificationPayload>,
    pub channels: Vec<Channel>,
    pub priority: Priority,
    pub language: Language,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub delivery_attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    /// Dispatch claim marker: set atomically when a worker takes the job so a
    /// restart or competing worker cannot fire it twice.
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Everything callers provide; the store fills in identity and state.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub recipient: Uuid,
    pub sender: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: Option<NotificationPayload>,
    pub channels: Vec<Channel>,
    pub priority: Priority,
    pub language: Language,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl NotificationJob {
    pub fn from_draft(draft: NotificationDraft, now: DateTime<Utc>) -> Result<Self, CivicError> {
        if draft.title.trim().is_empty() || draft.title.chars().count() > MAX_TITLE_LEN {
            return Err(CivicError::Validation(format!(
                "title must be 1-{MAX_TITLE_LEN} characters"
            )));
        }
        if draft.body.trim().is_empty() || draft.body.chars().count() > MAX_BODY_LEN {
            return Err(CivicError::Validation(format!(
                "body must be 1-{MAX_BODY_LEN} characters"
            )));
        }
        if draft.channels.is_empty() {
            return Err(CivicError::Validation(
                "at least one delivery channel is required".into(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            recipient: draft.recipient,
            sender: draft.sender,
            kind: draft.kind,
            title: draft.title,
            body: draft.body,
            payload: draft.payload,
            channels: draft.channels,
            priority: draft.priority,
            language: draft.language,
            scheduled_for: draft.scheduled_for,
            status: DeliveryStatus::Pending,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            is_read: false,
            delivery_attempts: 0,
            last_attempt_at: None,
            failure_reason: None,
            claimed_at: None,
            created_at: now,
        })
    }

    /// Ready for dispatch: still pending, unclaimed, and past any hold time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == DeliveryStatus::Pending
            && self.claimed_at.is_none()
            && self.scheduled_for.map_or(true, |at| at <= now)
    }

    pub fn mark_sent(&mut self, now: DateTime<Utc>) {
        self.status = DeliveryStatus::Sent;
        self.sent_at = Some(now);
    }

    /// Provider delivery confirmation. Only meaningful after a send.
    pub fn mark_delivered(&mut self, now: DateTime<Utc>) {
        if self.status == DeliveryStatus::Sent {
            self.status = DeliveryStatus::Delivered;
            self.delivered_at = Some(now);
        }
    }

    pub fn mark_failed(&mut self, reason: &str, now: DateTime<Utc>) {
        self.status = DeliveryStatus::Failed;
        self.failure_reason = Some(reason.to_string());
        self.delivery_attempts += 1;
        self.last_attempt_at = Some(now);
    }

    /// Recipient read action. The read-projection always updates; the channel
    /// state only advances to `read` from `sent` or `delivered`.
    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        self.is_read = true;
        self.read_at = Some(now);
        if matches!(self.status, DeliveryStatus::Sent | DeliveryStatus::Delivered) {
            self.status = DeliveryStatus::Read;
        }
    }
}
