use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use civicsignal_common::{
    Category, CivicError, GeoPoint, IssueStatus, Language, Priority, Sentiment,
};

use crate::scoring;

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const URGENCY_THRESHOLD: u8 = 80;

// --- Timeline ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAction {
    Created,
    Acknowledged,
    #[serde(rename = "in-progress")]
    InProgress,
    Resolved,
    Rejected,
    Duplicate,
    Assigned,
    Updated,
    Reopened,
}

impl TimelineAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineAction::Created => "created",
            TimelineAction::Acknowledged => "acknowledged",
            TimelineAction::InProgress => "in-progress",
            TimelineAction::Resolved => "resolved",
            TimelineAction::Rejected => "rejected",
            TimelineAction::Duplicate => "duplicate",
            TimelineAction::Assigned => "assigned",
            TimelineAction::Updated => "updated",
            TimelineAction::Reopened => "reopened",
        }
    }
}

impl From<IssueStatus> for TimelineAction {
    fn from(status: IssueStatus) -> Self {
        match status {
            IssueStatus::Pending => TimelineAction::Updated,
            IssueStatus::Acknowledged => TimelineAction::Acknowledged,
            IssueStatus::InProgress => TimelineAction::InProgress,
            IssueStatus::Resolved => TimelineAction::Resolved,
            IssueStatus::Rejected => TimelineAction::Rejected,
            IssueStatus::Duplicate => TimelineAction::Duplicate,
        }
    }
}

/// One append-only audit log entry. Never mutated or reordered after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub action: TimelineAction,
    pub description: String,
    pub actor: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

// --- Engagement ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub views: u64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub shares: u64,
    pub comments: u64,
}

/// Which engagement counter to bump. Counters are monotonic; there is no undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Views,
    Upvotes,
    Downvotes,
    Shares,
    Comments,
}

impl EngagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::Views => "views",
            EngagementKind::Upvotes => "upvotes",
            EngagementKind::Downvotes => "downvotes",
            EngagementKind::Shares => "shares",
            EngagementKind::Comments => "comments",
        }
    }
}

// --- Intake analysis / feedback / location / media ---

/// Classifier output attached at intake. Written once, never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub sentiment: Sentiment,
    pub urgency_score: u8,
    pub keywords: Vec<String>,
    pub confidence: f32,
    pub classified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: u8,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub helpful: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueLocation {
    pub point: GeoPoint,
    pub address: String,
    pub locality: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CivicError> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "document" => Ok(MediaKind::Document),
            other => Err(CivicError::Validation(format!("unknown media kind: {other}"))),
        }
    }
}

/// Media is referenced by URL only; the engine never inspects file bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
}

// --- Issue ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub reporter: Uuid,
    pub assigned_to: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub subcategory: String,
    pub priority: Priority,
    pub status: IssueStatus,
    pub language: Language,
    pub location: IssueLocation,
    pub media: Vec<MediaRef>,
    pub tags: Vec<String>,
    pub timeline: Vec<TimelineEntry>,
    pub engagement: Engagement,
    pub ai_analysis: Option<AiAnalysis>,
    pub feedback: Option<Feedback>,
    pub is_public: bool,
    pub is_urgent: bool,
    pub estimated_resolution: Option<DateTime<Utc>>,
    pub actual_resolution: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Citizen submission, before classification fills the gaps.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub priority: Option<Priority>,
    pub language: Option<Language>,
    pub location: IssueLocation,
    pub media: Vec<MediaRef>,
    pub tags: Vec<String>,
    pub is_public: bool,
}

/// Partial update from the owning reporter or an official.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub estimated_resolution: Option<DateTime<Utc>>,
}

impl Issue {
    /// Build a fresh issue in `pending` with the mandatory creation entry.
    pub fn create(
        input: NewIssue,
        reporter: Uuid,
        analysis: Option<AiAnalysis>,
        now: DateTime<Utc>,
    ) -> Result<Self, CivicError> {
        if input.title.trim().is_empty() {
            return Err(CivicError::Validation("title is required".into()));
        }
        if input.title.chars().count() > MAX_TITLE_LEN {
            return Err(CivicError::Validation(format!(
                "title cannot exceed {MAX_TITLE_LEN} characters"
            )));
        }
        if input.description.trim().is_empty() {
            return Err(CivicError::Validation("description is required".into()));
        }
        if input.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(CivicError::Validation(format!(
                "description cannot exceed {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        civicsignal_common::validate_coordinates(input.location.point.lon, input.location.point.lat)?;

        let mut issue = Self {
            id: Uuid::new_v4(),
            reporter,
            assigned_to: None,
            title: input.title,
            description: input.description,
            category: input.category.unwrap_or(Category::Other),
            subcategory: input.subcategory.unwrap_or_else(|| "general".to_string()),
            priority: input.priority.unwrap_or(Priority::Medium),
            status: IssueStatus::Pending,
            language: input.language.unwrap_or_default(),
            location: input.location,
            media: input.media,
            tags: input.tags,
            timeline: vec![TimelineEntry {
                action: TimelineAction::Created,
                description: "Issue reported".to_string(),
                actor: reporter,
                timestamp: now,
                metadata: json!({}),
            }],
            engagement: Engagement::default(),
            ai_analysis: analysis,
            feedback: None,
            is_public: input.is_public,
            is_urgent: false,
            estimated_resolution: None,
            actual_resolution: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        };
        issue.recompute_urgency();
        Ok(issue)
    }

    pub fn urgency_score(&self) -> u8 {
        self.ai_analysis.as_ref().map(|a| a.urgency_score).unwrap_or(0)
    }

    /// Invariant: urgent iff critical priority or urgency score above 80.
    /// Must be re-run whenever priority or urgency score changes.
    pub fn recompute_urgency(&mut self) {
        self.is_urgent =
            self.priority == Priority::Critical || self.urgency_score() > URGENCY_THRESHOLD;
    }

    pub fn engagement_score(&self) -> i64 {
        scoring::engagement_score(&self.engagement)
    }

    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    pub fn resolution_time_in_days(&self) -> Option<i64> {
        self.actual_resolution
            .map(|resolved| (resolved - self.created_at).num_days())
    }

    fn status_description(status: IssueStatus) -> String {
        match status {
            IssueStatus::Acknowledged => "Issue acknowledged by authorities".to_string(),
            IssueStatus::InProgress => "Work started on the issue".to_string(),
            IssueStatus::Resolved => "Issue has been resolved".to_string(),
            IssueStatus::Rejected => "Issue was rejected".to_string(),
            IssueStatus::Duplicate => "Issue marked as duplicate".to_string(),
            other => format!("Status changed to {other}"),
        }
    }

    /// Move to a new status, appending the audit entry. Regressions are legal
    /// and recorded; leaving a terminal state is logged as `reopened`.
    pub fn apply_transition(
        &mut self,
        new_status: IssueStatus,
        actor: Uuid,
        notes: &str,
        now: DateTime<Utc>,
    ) {
        let old_status = self.status;
        let action = if old_status.is_terminal() && !new_status.is_terminal() {
            TimelineAction::Reopened
        } else {
            TimelineAction::from(new_status)
        };

        self.timeline.push(TimelineEntry {
            action,
            description: Self::status_description(new_status),
            actor,
            timestamp: now,
            metadata: json!({ "old_status": old_status, "notes": notes }),
        });
        self.status = new_status;

        // Stamped exactly once, at the first transition into resolved.
        if new_status == IssueStatus::Resolved && self.actual_resolution.is_none() {
            self.actual_resolution = Some(now);
        }
        if new_status == IssueStatus::Resolved && !notes.is_empty() {
            self.resolution_notes = Some(notes.to_string());
        }

        self.recompute_urgency();
        self.updated_at = now;
    }

    /// Assignment is a side-channel mutation: timeline entry, no status change.
    pub fn apply_assignment(&mut self, assignee: Uuid, actor: Uuid, now: DateTime<Utc>) {
        self.assigned_to = Some(assignee);
        self.timeline.push(TimelineEntry {
            action: TimelineAction::Assigned,
            description: format!("Issue assigned to {assignee}"),
            actor,
            timestamp: now,
            metadata: json!({ "assignee_id": assignee }),
        });
        self.updated_at = now;
    }

    pub fn apply_patch(&mut self, patch: IssuePatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(subcategory) = patch.subcategory {
            self.subcategory = subcategory;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
        if let Some(estimated) = patch.estimated_resolution {
            self.estimated_resolution = Some(estimated);
        }
        self.recompute_urgency();
        self.updated_at = now;
    }

    pub fn bump(&mut self, kind: EngagementKind) {
        let counter = match kind {
            EngagementKind::Views => &mut self.engagement.views,
            EngagementKind::Upvotes => &mut self.engagement.upvotes,
            EngagementKind::Downvotes => &mut self.engagement.downvotes,
            EngagementKind::Shares => &mut self.engagement.shares,
            EngagementKind::Comments => &mut self.engagement.comments,
        };
        *counter += 1;
    }

    pub fn set_feedback(&mut self, feedback: Feedback, now: DateTime<Utc>) -> Result<(), CivicError> {
        if !(1..=5).contains(&feedback.rating) {
            return Err(CivicError::Validation(format!(
                "feedback rating must be 1-5, got {}",
                feedback.rating
            )));
        }
        self.feedback = Some(feedback);
        self.updated_at = now;
        Ok(())
    }
}
