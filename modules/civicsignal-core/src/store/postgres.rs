//! Postgres backends. Runtime-checked queries over `sqlx::query_as`; nested
//! documents (timeline, media, analysis) live in JSONB columns while the
//! engagement counters are plain bigints so increments stay atomic in SQL.
//! Transient connection errors are retried a bounded number of times before
//! surfacing; issue mutations go through an optimistic compare-and-set on
//! `updated_at` so concurrent writers never overwrite each other.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::Postgres;
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use civicsignal_common::{Category, CivicError, GeoPoint, IssueStatus, Language, Priority};

use crate::issue::{
    AiAnalysis, Engagement, EngagementKind, Feedback, Issue, IssueLocation, MediaRef,
    TimelineEntry,
};
use crate::notification::{
    Channel, DeliveryStatus, NotificationJob, NotificationKind, NotificationPayload,
};
use crate::store::{
    IssueFilter, IssueSort, IssueStore, NotificationFilter, NotificationStore, Visibility,
};

const DB_ATTEMPTS: u32 = 3;
const MUTATE_ATTEMPTS: u32 = 5;

fn db_err(err: sqlx::Error) -> CivicError {
    CivicError::Database(err.to_string())
}

fn transient(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

/// Run `op` up to [`DB_ATTEMPTS`] times, retrying only transient connection
/// failures. Anything else surfaces on the first attempt.
async fn retried<T, F, Fut>(mut op: F) -> Result<T, CivicError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Err(err) if transient(&err) && attempt < DB_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "transient database error, retrying");
                attempt += 1;
            }
            result => return result.map_err(db_err),
        }
    }
}

// --- Issues ---

#[derive(Debug, sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    reporter: Uuid,
    assigned_to: Option<Uuid>,
    title: String,
    description: String,
    category: String,
    subcategory: String,
    priority: String,
    status: String,
    language: String,
    lon: f64,
    lat: f64,
    address: String,
    locality: Option<String>,
    district: Option<String>,
    state: Option<String>,
    pincode: Option<String>,
    media: Json<Vec<MediaRef>>,
    tags: Vec<String>,
    timeline: Json<Vec<TimelineEntry>>,
    views: i64,
    upvotes: i64,
    downvotes: i64,
    shares: i64,
    comments: i64,
    ai_analysis: Option<Json<AiAnalysis>>,
    feedback: Option<Json<Feedback>>,
    is_public: bool,
    is_urgent: bool,
    estimated_resolution: Option<DateTime<Utc>>,
    actual_resolution: Option<DateTime<Utc>>,
    resolution_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IssueRow> for Issue {
    type Error = CivicError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        Ok(Issue {
            id: row.id,
            reporter: row.reporter,
            assigned_to: row.assigned_to,
            title: row.title,
            description: row.description,
            category: Category::parse(&row.category)?,
            subcategory: row.subcategory,
            priority: Priority::parse(&row.priority)?,
            status: IssueStatus::parse(&row.status)?,
            language: Language::from_str_loose(&row.language),
            location: IssueLocation {
                point: GeoPoint { lon: row.lon, lat: row.lat },
                address: row.address,
                locality: row.locality,
                district: row.district,
                state: row.state,
                pincode: row.pincode,
            },
            media: row.media.0,
            tags: row.tags,
            timeline: row.timeline.0,
            engagement: Engagement {
                views: row.views as u64,
                upvotes: row.upvotes as u64,
                downvotes: row.downvotes as u64,
                shares: row.shares as u64,
                comments: row.comments as u64,
            },
            ai_analysis: row.ai_analysis.map(|json| json.0),
            feedback: row.feedback.map(|json| json.0),
            is_public: row.is_public,
            is_urgent: row.is_urgent,
            estimated_resolution: row.estimated_resolution,
            actual_resolution: row.actual_resolution,
            resolution_notes: row.resolution_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn issues_from_rows(rows: Vec<IssueRow>) -> Result<Vec<Issue>, CivicError> {
    rows.into_iter().map(Issue::try_from).collect()
}

#[derive(Clone)]
pub struct PgIssueStore {
    pool: PgPool,
}

impl PgIssueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write the mutated row only if nobody else committed since we read it.
    /// `expected` is the `updated_at` the row carried at read time.
    async fn write_guarded(
        &self,
        issue: &Issue,
        expected: DateTime<Utc>,
    ) -> Result<bool, CivicError> {
        let result = retried(|| async {
            sqlx::query(
                r#"
                UPDATE issues SET
                    assigned_to = $2, title = $3, description = $4,
                    category = $5, subcategory = $6, priority = $7, status = $8,
                    language = $9, media = $10, tags = $11, timeline = $12,
                    ai_analysis = $13, feedback = $14,
                    is_public = $15, is_urgent = $16,
                    estimated_resolution = $17, actual_resolution = $18,
                    resolution_notes = $19, updated_at = $20
                WHERE id = $1 AND updated_at = $21
                "#,
            )
            .bind(issue.id)
            .bind(issue.assigned_to)
            .bind(&issue.title)
            .bind(&issue.description)
            .bind(issue.category.as_str())
            .bind(&issue.subcategory)
            .bind(issue.priority.as_str())
            .bind(issue.status.as_str())
            .bind(issue.language.as_str())
            .bind(Json(&issue.media))
            .bind(&issue.tags)
            .bind(Json(&issue.timeline))
            .bind(issue.ai_analysis.as_ref().map(Json))
            .bind(issue.feedback.as_ref().map(Json))
            .bind(issue.is_public)
            .bind(issue.is_urgent)
            .bind(issue.estimated_resolution)
            .bind(issue.actual_resolution)
            .bind(&issue.resolution_notes)
            .bind(issue.updated_at)
            .bind(expected)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_issue_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &IssueFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(reporter) = filter.reporter {
        qb.push(" AND reporter = ").push_bind(reporter);
    }
    if let Some(assignee) = filter.assigned_to {
        qb.push(" AND assigned_to = ").push_bind(assignee);
    }
    if let Some(is_urgent) = filter.is_urgent {
        qb.push(" AND is_urgent = ").push_bind(is_urgent);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.to_lowercase());
        qb.push(" AND (lower(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(description) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE lower(tag) LIKE ")
            .push_bind(pattern)
            .push("))");
    }
    match filter.visibility {
        Visibility::PublicOnly => {
            qb.push(" AND is_public");
        }
        Visibility::PublicOrReporter(viewer) => {
            qb.push(" AND (is_public OR reporter = ").push_bind(viewer).push(")");
        }
        Visibility::All => {}
    }
}

fn order_clause(sort: IssueSort) -> &'static str {
    match sort {
        IssueSort::Newest => " ORDER BY created_at DESC, id ASC",
        IssueSort::Oldest => " ORDER BY created_at ASC, id ASC",
        // Priority is stored as text; decode the rank inline.
        IssueSort::HighestPriority => {
            " ORDER BY CASE priority \
               WHEN 'critical' THEN 4 WHEN 'high' THEN 3 \
               WHEN 'medium' THEN 2 ELSE 1 END DESC, \
             created_at DESC, id ASC"
        }
        IssueSort::MostEngaged => {
            " ORDER BY (upvotes * 2 + shares + comments - downvotes + views / 10) DESC, \
             created_at DESC, id ASC"
        }
    }
}

#[async_trait]
impl IssueStore for PgIssueStore {
    async fn insert(&self, issue: Issue) -> Result<(), CivicError> {
        retried(|| async {
            sqlx::query(
                r#"
                INSERT INTO issues (
                    id, reporter, assigned_to, title, description,
                    category, subcategory, priority, status, language,
                    lon, lat, address, locality, district, state, pincode,
                    media, tags, timeline,
                    views, upvotes, downvotes, shares, comments,
                    ai_analysis, feedback,
                    is_public, is_urgent,
                    estimated_resolution, actual_resolution, resolution_notes,
                    created_at, updated_at
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                    $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                    $31, $32, $33, $34
                )
                "#,
            )
            .bind(issue.id)
            .bind(issue.reporter)
            .bind(issue.assigned_to)
            .bind(&issue.title)
            .bind(&issue.description)
            .bind(issue.category.as_str())
            .bind(&issue.subcategory)
            .bind(issue.priority.as_str())
            .bind(issue.status.as_str())
            .bind(issue.language.as_str())
            .bind(issue.location.point.lon)
            .bind(issue.location.point.lat)
            .bind(&issue.location.address)
            .bind(&issue.location.locality)
            .bind(&issue.location.district)
            .bind(&issue.location.state)
            .bind(&issue.location.pincode)
            .bind(Json(&issue.media))
            .bind(&issue.tags)
            .bind(Json(&issue.timeline))
            .bind(issue.engagement.views as i64)
            .bind(issue.engagement.upvotes as i64)
            .bind(issue.engagement.downvotes as i64)
            .bind(issue.engagement.shares as i64)
            .bind(issue.engagement.comments as i64)
            .bind(issue.ai_analysis.as_ref().map(Json))
            .bind(issue.feedback.as_ref().map(Json))
            .bind(issue.is_public)
            .bind(issue.is_urgent)
            .bind(issue.estimated_resolution)
            .bind(issue.actual_resolution)
            .bind(&issue.resolution_notes)
            .bind(issue.created_at)
            .bind(issue.updated_at)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Issue>, CivicError> {
        let row = retried(|| async {
            sqlx::query_as::<_, IssueRow>("SELECT * FROM issues WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        })
        .await?;
        row.map(Issue::try_from).transpose()
    }

    async fn mutate(
        &self,
        id: Uuid,
        apply: &mut (dyn for<'a> FnMut(&'a mut Issue) -> Result<(), CivicError> + Send),
    ) -> Result<Issue, CivicError> {
        // Optimistic concurrency: when a concurrent writer commits between
        // our read and our guarded write, re-read and re-apply.
        for _ in 0..MUTATE_ATTEMPTS {
            let row = retried(|| async {
                sqlx::query_as::<_, IssueRow>("SELECT * FROM issues WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("issue {id}")))?;

            let expected = row.updated_at;
            let mut issue = Issue::try_from(row)?;
            apply(&mut issue)?;

            if self.write_guarded(&issue, expected).await? {
                return Ok(issue);
            }
            tracing::debug!(issue_id = %id, "lost mutation race, retrying");
        }
        Err(CivicError::Database(format!(
            "issue {id}: gave up after {MUTATE_ATTEMPTS} conflicting writes"
        )))
    }

    async fn list(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError> {
        let rows = retried(|| async {
            let mut qb = QueryBuilder::new("SELECT * FROM issues");
            push_issue_filter(&mut qb, filter);
            qb.push(order_clause(sort));
            qb.push(" LIMIT ").push_bind(limit as i64);
            qb.push(" OFFSET ").push_bind(offset as i64);
            qb.build_query_as::<IssueRow>().fetch_all(&self.pool).await
        })
        .await?;
        issues_from_rows(rows)
    }

    async fn count(&self, filter: &IssueFilter) -> Result<u64, CivicError> {
        let count: i64 = retried(|| async {
            let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM issues");
            push_issue_filter(&mut qb, filter);
            qb.build_query_scalar().fetch_one(&self.pool).await
        })
        .await?;
        Ok(count as u64)
    }

    async fn nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError> {
        civicsignal_common::validate_coordinates(point.lon, point.lat)?;
        let rows = retried(|| async {
            sqlx::query_as::<_, IssueRow>(
                r#"
                SELECT * FROM issues
                WHERE is_public
                  AND 6371 * acos(LEAST(1.0,
                        cos(radians($1)) * cos(radians(lat)) * cos(radians(lon) - radians($2))
                        + sin(radians($1)) * sin(radians(lat))
                      )) <= $3
                ORDER BY 6371 * acos(LEAST(1.0,
                        cos(radians($1)) * cos(radians(lat)) * cos(radians(lon) - radians($2))
                        + sin(radians($1)) * sin(radians(lat))
                      )) ASC, id ASC
                LIMIT $4
                "#,
            )
            .bind(point.lat)
            .bind(point.lon)
            .bind(radius_km)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        })
        .await?;
        issues_from_rows(rows)
    }

    async fn bump_engagement(&self, id: Uuid, kind: EngagementKind) -> Result<Issue, CivicError> {
        // Counter column names come from the enum, never from callers.
        let sql = format!(
            "UPDATE issues SET {col} = {col} + 1 WHERE id = $1 RETURNING *",
            col = kind.as_str()
        );
        let row = retried(|| async {
            sqlx::query_as::<_, IssueRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        })
        .await?
        .ok_or_else(|| CivicError::NotFound(format!("issue {id}")))?;
        Issue::try_from(row)
    }

    async fn created_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Issue>, CivicError> {
        let rows = retried(|| async {
            sqlx::query_as::<_, IssueRow>(
                "SELECT * FROM issues WHERE created_at >= $1 ORDER BY created_at DESC",
            )
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
        })
        .await?;
        issues_from_rows(rows)
    }

    async fn all(&self) -> Result<Vec<Issue>, CivicError> {
        let rows = retried(|| async {
            sqlx::query_as::<_, IssueRow>("SELECT * FROM issues")
                .fetch_all(&self.pool)
                .await
        })
        .await?;
        issues_from_rows(rows)
    }
}

// --- Notifications ---

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient: Uuid,
    sender: Option<Uuid>,
    kind: String,
    title: String,
    body: String,
    payload: Option<Json<NotificationPayload>>,
    channels: Vec<String>,
    priority: String,
    language: String,
    scheduled_for: Option<DateTime<Utc>>,
    status: String,
    sent_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    is_read: bool,
    delivery_attempts: i32,
    last_attempt_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for NotificationJob {
    type Error = CivicError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(NotificationJob {
            id: row.id,
            recipient: row.recipient,
            sender: row.sender,
            kind: NotificationKind::parse(&row.kind)?,
            title: row.title,
            body: row.body,
            payload: row.payload.map(|json| json.0),
            channels: row
                .channels
                .iter()
                .map(|c| Channel::parse(c))
                .collect::<Result<Vec<_>, _>>()?,
            priority: Priority::parse(&row.priority)?,
            language: Language::from_str_loose(&row.language),
            scheduled_for: row.scheduled_for,
            status: DeliveryStatus::parse(&row.status)?,
            sent_at: row.sent_at,
            delivered_at: row.delivered_at,
            read_at: row.read_at,
            is_read: row.is_read,
            delivery_attempts: row.delivery_attempts as u32,
            last_attempt_at: row.last_attempt_at,
            failure_reason: row.failure_reason,
            claimed_at: row.claimed_at,
            created_at: row.created_at,
        })
    }
}

fn jobs_from_rows(rows: Vec<NotificationRow>) -> Result<Vec<NotificationJob>, CivicError> {
    rows.into_iter().map(NotificationJob::try_from).collect()
}

#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_notification_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &NotificationFilter) {
    qb.push(" WHERE TRUE");
    if let Some(recipient) = filter.recipient {
        qb.push(" AND recipient = ").push_bind(recipient);
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if filter.unread_only {
        qb.push(" AND NOT is_read");
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, job: NotificationJob) -> Result<(), CivicError> {
        let channels: Vec<String> =
            job.channels.iter().map(|c| c.as_str().to_string()).collect();
        retried(|| async {
            sqlx::query(
                r#"
                INSERT INTO notifications (
                    id, recipient, sender, kind, title, body, payload,
                    channels, priority, language, scheduled_for, status,
                    sent_at, delivered_at, read_at, is_read,
                    delivery_attempts, last_attempt_at, failure_reason,
                    claimed_at, created_at
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
                )
                "#,
            )
            .bind(job.id)
            .bind(job.recipient)
            .bind(job.sender)
            .bind(job.kind.as_str())
            .bind(&job.title)
            .bind(&job.body)
            .bind(job.payload.as_ref().map(Json))
            .bind(&channels)
            .bind(job.priority.as_str())
            .bind(job.language.as_str())
            .bind(job.scheduled_for)
            .bind(job.status.as_str())
            .bind(job.sent_at)
            .bind(job.delivered_at)
            .bind(job.read_at)
            .bind(job.is_read)
            .bind(job.delivery_attempts as i32)
            .bind(job.last_attempt_at)
            .bind(&job.failure_reason)
            .bind(job.claimed_at)
            .bind(job.created_at)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<NotificationJob>, CivicError> {
        let row = retried(|| async {
            sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        })
        .await?;
        row.map(NotificationJob::try_from).transpose()
    }

    async fn update(&self, job: NotificationJob) -> Result<(), CivicError> {
        let result = retried(|| async {
            sqlx::query(
                r#"
                UPDATE notifications SET
                    status = $2, sent_at = $3, delivered_at = $4, read_at = $5,
                    is_read = $6, delivery_attempts = $7, last_attempt_at = $8,
                    failure_reason = $9, claimed_at = $10
                WHERE id = $1
                "#,
            )
            .bind(job.id)
            .bind(job.status.as_str())
            .bind(job.sent_at)
            .bind(job.delivered_at)
            .bind(job.read_at)
            .bind(job.is_read)
            .bind(job.delivery_attempts as i32)
            .bind(job.last_attempt_at)
            .bind(&job.failure_reason)
            .bind(job.claimed_at)
            .execute(&self.pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(CivicError::NotFound(format!("notification {}", job.id)));
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, CivicError> {
        let rows = retried(|| async {
            let mut qb = QueryBuilder::new("SELECT * FROM notifications");
            push_notification_filter(&mut qb, filter);
            qb.push(" ORDER BY created_at DESC, id ASC");
            qb.push(" LIMIT ").push_bind(limit as i64);
            qb.push(" OFFSET ").push_bind(offset as i64);
            qb.build_query_as::<NotificationRow>().fetch_all(&self.pool).await
        })
        .await?;
        jobs_from_rows(rows)
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<u64, CivicError> {
        let count: i64 = retried(|| async {
            let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM notifications");
            push_notification_filter(&mut qb, filter);
            qb.build_query_scalar().fetch_one(&self.pool).await
        })
        .await?;
        Ok(count as u64)
    }

    async fn unread_count(&self, recipient: Uuid) -> Result<u64, CivicError> {
        let count: i64 = retried(|| async {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM notifications WHERE recipient = $1 AND NOT is_read",
            )
            .bind(recipient)
            .fetch_one(&self.pool)
            .await
        })
        .await?;
        Ok(count as u64)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, CivicError> {
        // SKIP LOCKED keeps competing workers from blocking on each other;
        // the claimed_at guard keeps a job from being handed out twice.
        let rows = retried(|| async {
            sqlx::query_as::<_, NotificationRow>(
                r#"
                UPDATE notifications SET claimed_at = $1
                WHERE id IN (
                    SELECT id FROM notifications
                    WHERE status = 'pending'
                      AND claimed_at IS NULL
                      AND (scheduled_for IS NULL OR scheduled_for <= $1)
                    ORDER BY COALESCE(scheduled_for, created_at) ASC
                    LIMIT $2
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING *
                "#,
            )
            .bind(now)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        })
        .await?;
        jobs_from_rows(rows)
    }

    async fn cancel(&self, id: Uuid) -> Result<bool, CivicError> {
        let result = retried(|| async {
            sqlx::query(
                "DELETE FROM notifications
                 WHERE id = $1 AND status = 'pending' AND claimed_at IS NULL",
            )
            .bind(id)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CivicError> {
        let result = retried(|| async {
            sqlx::query("DELETE FROM notifications WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient: Uuid, now: DateTime<Utc>) -> Result<u64, CivicError> {
        let result = retried(|| async {
            sqlx::query(
                r#"
                UPDATE notifications SET
                    is_read = TRUE,
                    read_at = $2,
                    status = CASE WHEN status IN ('sent', 'delivered')
                                  THEN 'read' ELSE status END
                WHERE recipient = $1 AND NOT is_read
                "#,
            )
            .bind(recipient)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retried_recovers_from_transient_errors() {
        let attempts = AtomicU32::new(0);
        let value = retried(|| async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(sqlx::Error::PoolTimedOut)
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retried_gives_up_after_bounded_attempts() {
        let attempts = AtomicU32::new(0);
        let err = retried::<(), _, _>(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(sqlx::Error::PoolTimedOut)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CivicError::Database(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), DB_ATTEMPTS);
    }

    #[tokio::test]
    async fn retried_surfaces_other_errors_on_the_first_attempt() {
        let attempts = AtomicU32::new(0);
        let err = retried::<(), _, _>(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(sqlx::Error::RowNotFound)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CivicError::Database(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
