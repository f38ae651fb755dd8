//! Persistence traits plus the two backends: in-memory for tests and tools,
//! Postgres for production.

pub mod memory;
pub mod postgres;

pub use memory::{MemoryIssueStore, MemoryNotificationStore};
pub use postgres::{PgIssueStore, PgNotificationStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use civicsignal_common::{Category, CivicError, GeoPoint, IssueStatus, Priority};

use crate::issue::{EngagementKind, Issue};
use crate::notification::{DeliveryStatus, NotificationJob, NotificationKind};

/// Who gets to see non-public issues in a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Anonymous or citizen browsing: public issues only.
    #[default]
    PublicOnly,
    /// Public issues plus the viewer's own private reports.
    PublicOrReporter(Uuid),
    /// Officials and admins see everything.
    All,
}

#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub reporter: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub is_urgent: Option<bool>,
    /// Case-insensitive substring over title, description and tags.
    pub search: Option<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IssueSort {
    #[default]
    Newest,
    Oldest,
    HighestPriority,
    MostEngaged,
}

#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn insert(&self, issue: Issue) -> Result<(), CivicError>;

    async fn get(&self, id: Uuid) -> Result<Option<Issue>, CivicError>;

    /// Apply `apply` to the stored issue atomically with respect to other
    /// mutations of the same row and return the committed state. An `Err`
    /// from the closure aborts the write and leaves the row untouched.
    /// The closure may run more than once when a concurrent writer commits
    /// first, so it must mutate only the issue it is handed.
    async fn mutate(
        &self,
        id: Uuid,
        apply: &mut (dyn for<'a> FnMut(&'a mut Issue) -> Result<(), CivicError> + Send),
    ) -> Result<Issue, CivicError>;

    async fn list(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError>;

    async fn count(&self, filter: &IssueFilter) -> Result<u64, CivicError>;

    /// Public issues within `radius_km` of `point`, nearest first.
    async fn nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError>;

    /// Atomically increment one engagement counter and return the fresh row.
    /// Concurrent bumps must never lose increments.
    async fn bump_engagement(&self, id: Uuid, kind: EngagementKind) -> Result<Issue, CivicError>;

    /// Issues created at or after `cutoff`, for trending rank.
    async fn created_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Issue>, CivicError>;

    /// Full snapshot, for stats aggregation.
    async fn all(&self) -> Result<Vec<Issue>, CivicError>;
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub recipient: Option<Uuid>,
    pub kind: Option<NotificationKind>,
    pub status: Option<DeliveryStatus>,
    pub unread_only: bool,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, job: NotificationJob) -> Result<(), CivicError>;

    async fn get(&self, id: Uuid) -> Result<Option<NotificationJob>, CivicError>;

    /// Full-row replace keyed by id.
    async fn update(&self, job: NotificationJob) -> Result<(), CivicError>;

    /// Newest first.
    async fn list(
        &self,
        filter: &NotificationFilter,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, CivicError>;

    async fn count(&self, filter: &NotificationFilter) -> Result<u64, CivicError>;

    async fn unread_count(&self, recipient: Uuid) -> Result<u64, CivicError>;

    /// Atomically claim up to `limit` due pending jobs (compare-and-set on the
    /// claim marker) and return them. A job is handed to exactly one caller
    /// even across competing workers or restarts.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, CivicError>;

    /// Remove a still-pending, unclaimed job. Returns false (a no-op) once the
    /// job has been claimed or dispatched.
    async fn cancel(&self, id: Uuid) -> Result<bool, CivicError>;

    /// Remove a job unconditionally. Ownership checks belong to the caller.
    async fn delete(&self, id: Uuid) -> Result<bool, CivicError>;

    /// Flip the read-projection on every unread notification for `recipient`.
    /// Returns how many rows changed.
    async fn mark_all_read(&self, recipient: Uuid, now: DateTime<Utc>) -> Result<u64, CivicError>;
}
