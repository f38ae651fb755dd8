use async_graphql::*;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use civicsignal_core::issue::{
    AiAnalysis, Engagement, Feedback, Issue, IssueLocation, MediaRef, TimelineEntry,
};
use civicsignal_core::pagination::{Connection as CoreConnection, PageInfo};

/// GraphQL issue type wrapping the engine's Issue model.
#[derive(SimpleObject, Clone)]
pub struct GqlIssue {
    pub id: Uuid,
    pub reporter: Uuid,
    pub assigned_to: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub subcategory: String,
    pub priority: String,
    pub status: String,
    pub language: String,
    pub location: GqlLocation,
    pub media: Vec<GqlMedia>,
    pub tags: Vec<String>,
    pub timeline: Vec<GqlTimelineEntry>,
    pub engagement: GqlEngagement,
    pub engagement_score: i64,
    pub ai_analysis: Option<GqlAiAnalysis>,
    pub feedback: Option<GqlFeedback>,
    pub is_public: bool,
    pub is_urgent: bool,
    pub estimated_resolution: Option<DateTime<Utc>>,
    pub actual_resolution: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub resolution_time_in_days: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Issue> for GqlIssue {
    fn from(issue: Issue) -> Self {
        Self {
            engagement_score: issue.engagement_score(),
            resolution_time_in_days: issue.resolution_time_in_days(),
            id: issue.id,
            reporter: issue.reporter,
            assigned_to: issue.assigned_to,
            title: issue.title,
            description: issue.description,
            category: issue.category.to_string(),
            subcategory: issue.subcategory,
            priority: issue.priority.to_string(),
            status: issue.status.to_string(),
            language: issue.language.to_string(),
            location: GqlLocation::from(issue.location),
            media: issue.media.into_iter().map(GqlMedia::from).collect(),
            tags: issue.tags,
            timeline: issue.timeline.into_iter().map(GqlTimelineEntry::from).collect(),
            engagement: GqlEngagement::from(issue.engagement),
            ai_analysis: issue.ai_analysis.map(GqlAiAnalysis::from),
            feedback: issue.feedback.map(GqlFeedback::from),
            is_public: issue.is_public,
            is_urgent: issue.is_urgent,
            estimated_resolution: issue.estimated_resolution,
            actual_resolution: issue.actual_resolution,
            resolution_notes: issue.resolution_notes,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GqlLocation {
    pub longitude: f64,
    pub latitude: f64,
    pub address: String,
    pub locality: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

impl From<IssueLocation> for GqlLocation {
    fn from(location: IssueLocation) -> Self {
        Self {
            longitude: location.point.lon,
            latitude: location.point.lat,
            address: location.address,
            locality: location.locality,
            district: location.district,
            state: location.state,
            pincode: location.pincode,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GqlMedia {
    pub kind: String,
    pub url: String,
}

impl From<MediaRef> for GqlMedia {
    fn from(media: MediaRef) -> Self {
        Self { kind: media.kind.as_str().to_string(), url: media.url }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GqlTimelineEntry {
    pub action: String,
    pub description: String,
    pub actor: Uuid,
    pub timestamp: DateTime<Utc>,
    pub metadata: Json<serde_json::Value>,
}

impl From<TimelineEntry> for GqlTimelineEntry {
    fn from(entry: TimelineEntry) -> Self {
        Self {
            action: entry.action.as_str().to_string(),
            description: entry.description,
            actor: entry.actor,
            timestamp: entry.timestamp,
            metadata: Json(entry.metadata),
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GqlEngagement {
    pub views: u64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub shares: u64,
    pub comments: u64,
}

impl From<Engagement> for GqlEngagement {
    fn from(e: Engagement) -> Self {
        Self {
            views: e.views,
            upvotes: e.upvotes,
            downvotes: e.downvotes,
            shares: e.shares,
            comments: e.comments,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GqlAiAnalysis {
    pub sentiment: String,
    pub urgency_score: i32,
    pub keywords: Vec<String>,
    pub confidence: f32,
    pub classified_at: DateTime<Utc>,
}

impl From<AiAnalysis> for GqlAiAnalysis {
    fn from(analysis: AiAnalysis) -> Self {
        Self {
            sentiment: analysis.sentiment.to_string(),
            urgency_score: analysis.urgency_score as i32,
            keywords: analysis.keywords,
            confidence: analysis.confidence,
            classified_at: analysis.classified_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GqlFeedback {
    pub rating: i32,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub helpful: bool,
}

impl From<Feedback> for GqlFeedback {
    fn from(feedback: Feedback) -> Self {
        Self {
            rating: feedback.rating as i32,
            comment: feedback.comment,
            submitted_at: feedback.submitted_at,
            helpful: feedback.helpful,
        }
    }
}

// --- Connection shape ---

#[derive(SimpleObject, Clone)]
pub struct GqlPageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    pub total_count: u64,
}

impl From<PageInfo> for GqlPageInfo {
    fn from(info: PageInfo) -> Self {
        Self {
            has_next_page: info.has_next_page,
            has_previous_page: info.has_previous_page,
            start_cursor: info.start_cursor,
            end_cursor: info.end_cursor,
            total_count: info.total_count,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlIssueEdge {
    pub node: GqlIssue,
    pub cursor: String,
}

#[derive(SimpleObject)]
pub struct GqlIssueConnection {
    pub edges: Vec<GqlIssueEdge>,
    pub page_info: GqlPageInfo,
}

impl From<CoreConnection<Issue>> for GqlIssueConnection {
    fn from(conn: CoreConnection<Issue>) -> Self {
        Self {
            edges: conn
                .edges
                .into_iter()
                .map(|edge| GqlIssueEdge { node: GqlIssue::from(edge.node), cursor: edge.cursor })
                .collect(),
            page_info: GqlPageInfo::from(conn.page_info),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlIssueStats {
    pub total: u64,
    pub by_status: Vec<GqlStatusCount>,
    pub by_category: Vec<GqlCategoryCount>,
    pub by_priority: Vec<GqlPriorityCount>,
    pub avg_resolution_days: f64,
    pub resolution_rate: f64,
    pub trending_categories: Vec<String>,
}

#[derive(SimpleObject)]
pub struct GqlStatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(SimpleObject)]
pub struct GqlCategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(SimpleObject)]
pub struct GqlPriorityCount {
    pub priority: String,
    pub count: u64,
}

impl From<civicsignal_core::scoring::IssueStats> for GqlIssueStats {
    fn from(stats: civicsignal_core::scoring::IssueStats) -> Self {
        Self {
            total: stats.total,
            by_status: stats
                .by_status
                .into_iter()
                .map(|(status, count)| GqlStatusCount { status: status.to_string(), count })
                .collect(),
            by_category: stats
                .by_category
                .into_iter()
                .map(|(category, count)| GqlCategoryCount {
                    category: category.to_string(),
                    count,
                })
                .collect(),
            by_priority: stats
                .by_priority
                .into_iter()
                .map(|(priority, count)| GqlPriorityCount {
                    priority: priority.to_string(),
                    count,
                })
                .collect(),
            avg_resolution_days: stats.avg_resolution_days,
            resolution_rate: stats.resolution_rate,
            trending_categories: stats
                .trending_categories
                .into_iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

// --- Inputs ---

#[derive(InputObject)]
pub struct LocationInput {
    pub longitude: f64,
    pub latitude: f64,
    pub address: String,
    pub locality: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

#[derive(InputObject)]
pub struct MediaInput {
    /// image, video, audio or document
    pub kind: String,
    pub url: String,
}

#[derive(InputObject)]
pub struct NewIssueInput {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub priority: Option<String>,
    pub language: Option<String>,
    pub location: LocationInput,
    pub media: Option<Vec<MediaInput>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(InputObject)]
pub struct IssuePatchInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub priority: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub estimated_resolution: Option<DateTime<Utc>>,
}
