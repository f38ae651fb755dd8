//! In-memory backends over `tokio::sync::RwLock`. Used by unit and
//! integration tests and by local tooling that has no database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use civicsignal_common::{haversine_km, CivicError, GeoPoint};

use crate::issue::{EngagementKind, Issue};
use crate::notification::{DeliveryStatus, NotificationJob};
use crate::scoring::engagement_score;
use crate::store::{
    IssueFilter, IssueSort, IssueStore, NotificationFilter, NotificationStore, Visibility,
};

#[derive(Clone, Default)]
pub struct MemoryIssueStore {
    issues: Arc<RwLock<HashMap<Uuid, Issue>>>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(issue: &Issue, filter: &IssueFilter) -> bool {
    if let Some(status) = filter.status {
        if issue.status != status {
            return false;
        }
    }
    if let Some(category) = filter.category {
        if issue.category != category {
            return false;
        }
    }
    if let Some(priority) = filter.priority {
        if issue.priority != priority {
            return false;
        }
    }
    if let Some(reporter) = filter.reporter {
        if issue.reporter != reporter {
            return false;
        }
    }
    if let Some(assignee) = filter.assigned_to {
        if issue.assigned_to != Some(assignee) {
            return false;
        }
    }
    if let Some(is_urgent) = filter.is_urgent {
        if issue.is_urgent != is_urgent {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let hit = issue.title.to_lowercase().contains(&needle)
            || issue.description.to_lowercase().contains(&needle)
            || issue.tags.iter().any(|t| t.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    match filter.visibility {
        Visibility::PublicOnly => issue.is_public,
        Visibility::PublicOrReporter(viewer) => issue.is_public || issue.reporter == viewer,
        Visibility::All => true,
    }
}

fn sort_issues(issues: &mut [Issue], sort: IssueSort) {
    match sort {
        IssueSort::Newest => issues.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))
        }),
        IssueSort::Oldest => issues.sort_by(|a, b| {
            a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
        }),
        IssueSort::HighestPriority => issues.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        }),
        IssueSort::MostEngaged => issues.sort_by(|a, b| {
            engagement_score(&b.engagement)
                .cmp(&engagement_score(&a.engagement))
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        }),
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn insert(&self, issue: Issue) -> Result<(), CivicError> {
        self.issues.write().await.insert(issue.id, issue);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Issue>, CivicError> {
        Ok(self.issues.read().await.get(&id).cloned())
    }

    async fn mutate(
        &self,
        id: Uuid,
        apply: &mut (dyn for<'a> FnMut(&'a mut Issue) -> Result<(), CivicError> + Send),
    ) -> Result<Issue, CivicError> {
        // One write lock across read, apply and commit. The closure works on
        // a copy so a failing apply never half-mutates the stored row.
        let mut issues = self.issues.write().await;
        let current = issues
            .get_mut(&id)
            .ok_or_else(|| CivicError::NotFound(format!("issue {id}")))?;
        let mut next = current.clone();
        apply(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    async fn list(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError> {
        let mut matched: Vec<Issue> = self
            .issues
            .read()
            .await
            .values()
            .filter(|issue| matches(issue, filter))
            .cloned()
            .collect();
        sort_issues(&mut matched, sort);
        Ok(matched.into_iter().skip(offset as usize).take(limit).collect())
    }

    async fn count(&self, filter: &IssueFilter) -> Result<u64, CivicError> {
        Ok(self
            .issues
            .read()
            .await
            .values()
            .filter(|issue| matches(issue, filter))
            .count() as u64)
    }

    async fn nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError> {
        civicsignal_common::validate_coordinates(point.lon, point.lat)?;
        let mut hits: Vec<(f64, Issue)> = self
            .issues
            .read()
            .await
            .values()
            .filter(|issue| issue.is_public)
            .filter_map(|issue| {
                let km = haversine_km(
                    point.lat,
                    point.lon,
                    issue.location.point.lat,
                    issue.location.point.lon,
                );
                (km <= radius_km).then(|| (km, issue.clone()))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        Ok(hits.into_iter().take(limit).map(|(_, issue)| issue).collect())
    }

    async fn bump_engagement(&self, id: Uuid, kind: EngagementKind) -> Result<Issue, CivicError> {
        let mut issues = self.issues.write().await;
        let issue = issues
            .get_mut(&id)
            .ok_or_else(|| CivicError::NotFound(format!("issue {id}")))?;
        issue.bump(kind);
        Ok(issue.clone())
    }

    async fn created_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Issue>, CivicError> {
        Ok(self
            .issues
            .read()
            .await
            .values()
            .filter(|issue| issue.created_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Issue>, CivicError> {
        Ok(self.issues.read().await.values().cloned().collect())
    }
}

#[derive(Clone, Default)]
pub struct MemoryNotificationStore {
    jobs: Arc<RwLock<HashMap<Uuid, NotificationJob>>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn job_matches(job: &NotificationJob, filter: &NotificationFilter) -> bool {
    if let Some(recipient) = filter.recipient {
        if job.recipient != recipient {
            return false;
        }
    }
    if let Some(kind) = filter.kind {
        if job.kind != kind {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if job.status != status {
            return false;
        }
    }
    if filter.unread_only && job.is_read {
        return false;
    }
    true
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, job: NotificationJob) -> Result<(), CivicError> {
        self.jobs.write().await.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<NotificationJob>, CivicError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update(&self, job: NotificationJob) -> Result<(), CivicError> {
        let mut jobs = self.jobs.write().await;
        if !jobs.contains_key(&job.id) {
            return Err(CivicError::NotFound(format!("notification {}", job.id)));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, CivicError> {
        let mut matched: Vec<NotificationJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job_matches(job, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(matched.into_iter().skip(offset as usize).take(limit).collect())
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<u64, CivicError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job_matches(job, filter))
            .count() as u64)
    }

    async fn unread_count(&self, recipient: Uuid) -> Result<u64, CivicError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.recipient == recipient && !job.is_read)
            .count() as u64)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, CivicError> {
        // One write lock across scan and claim, so two callers can never
        // claim the same job.
        let mut jobs = self.jobs.write().await;
        let mut due: Vec<(DateTime<Utc>, Uuid)> = jobs
            .values()
            .filter(|job| job.is_due(now))
            .map(|job| (job.scheduled_for.unwrap_or(job.created_at), job.id))
            .collect();
        due.sort();
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for (_, id) in due {
            if let Some(job) = jobs.get_mut(&id) {
                job.claimed_at = Some(now);
                claimed.push(job.clone());
            }
        }
        Ok(claimed)
    }

    async fn cancel(&self, id: Uuid) -> Result<bool, CivicError> {
        let mut jobs = self.jobs.write().await;
        let cancellable = jobs
            .get(&id)
            .map(|job| job.status == DeliveryStatus::Pending && job.claimed_at.is_none())
            .unwrap_or(false);
        if cancellable {
            jobs.remove(&id);
        }
        Ok(cancellable)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CivicError> {
        Ok(self.jobs.write().await.remove(&id).is_some())
    }

    async fn mark_all_read(&self, recipient: Uuid, now: DateTime<Utc>) -> Result<u64, CivicError> {
        let mut jobs = self.jobs.write().await;
        let mut changed = 0;
        for job in jobs.values_mut() {
            if job.recipient == recipient && !job.is_read {
                job.mark_read(now);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::NewIssue;
    use crate::notification::NotificationJob;
    use crate::testutil::{new_issue_at, test_draft, test_new_issue};
    use civicsignal_common::IssueStatus;

    async fn seed(store: &MemoryIssueStore, input: NewIssue) -> Issue {
        let issue = Issue::create(input, Uuid::new_v4(), None, Utc::now()).unwrap();
        store.insert(issue.clone()).await.unwrap();
        issue
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bumps_lose_no_increments() {
        let store = MemoryIssueStore::new();
        let issue = seed(&store, test_new_issue()).await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let id = issue.id;
            handles.push(tokio::spawn(async move {
                store.bump_engagement(id, EngagementKind::Upvotes).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let fresh = store.get(issue.id).await.unwrap().unwrap();
        assert_eq!(fresh.engagement.upvotes, 50);
    }

    #[tokio::test]
    async fn nearby_is_sorted_by_distance_and_bounded_by_radius() {
        let store = MemoryIssueStore::new();
        // The Ridge, Shimla
        let origin = GeoPoint { lon: 77.1734, lat: 31.1048 };
        let close = seed(&store, new_issue_at(77.1750, 31.1050, "close")).await;
        let closer = seed(&store, new_issue_at(77.1735, 31.1049, "closer")).await;
        // Delhi, ~280 km out
        seed(&store, new_issue_at(77.2090, 28.6139, "far")).await;

        let hits = store.nearby(origin, 5.0, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, closer.id);
        assert_eq!(hits[1].id, close.id);
    }

    #[tokio::test]
    async fn nearby_excludes_private_issues() {
        let store = MemoryIssueStore::new();
        let mut input = test_new_issue();
        input.is_public = false;
        seed(&store, input).await;

        let origin = GeoPoint { lon: 77.1734, lat: 31.1048 };
        assert!(store.nearby(origin, 5.0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn visibility_filter() {
        let store = MemoryIssueStore::new();
        let reporter = Uuid::new_v4();
        let mut private = Issue::create(test_new_issue(), reporter, None, Utc::now()).unwrap();
        private.is_public = false;
        store.insert(private.clone()).await.unwrap();
        seed(&store, test_new_issue()).await;

        let public_only = IssueFilter::default();
        assert_eq!(store.count(&public_only).await.unwrap(), 1);

        let as_reporter = IssueFilter {
            visibility: Visibility::PublicOrReporter(reporter),
            ..Default::default()
        };
        assert_eq!(store.count(&as_reporter).await.unwrap(), 2);

        let as_official = IssueFilter { visibility: Visibility::All, ..Default::default() };
        assert_eq!(store.count(&as_official).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn search_filter_covers_title_description_and_tags() {
        let store = MemoryIssueStore::new();
        seed(&store, test_new_issue()).await;

        for needle in ["broken", "burst", "water"] {
            let filter =
                IssueFilter { search: Some(needle.to_string()), ..Default::default() };
            assert_eq!(store.count(&filter).await.unwrap(), 1, "needle {needle}");
        }

        let miss = IssueFilter { search: Some("pothole".to_string()), ..Default::default() };
        assert_eq!(store.count(&miss).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_lose_no_timeline_entries() {
        let store = MemoryIssueStore::new();
        let issue = seed(&store, test_new_issue()).await;

        let mut handles = Vec::new();
        for _ in 0..24 {
            let store = store.clone();
            let id = issue.id;
            handles.push(tokio::spawn(async move {
                store
                    .mutate(id, &mut |issue| {
                        issue.apply_transition(
                            IssueStatus::Acknowledged,
                            Uuid::new_v4(),
                            "",
                            Utc::now(),
                        );
                        Ok(())
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let fresh = store.get(issue.id).await.unwrap().unwrap();
        assert_eq!(fresh.timeline.len(), 25, "creation entry plus one per transition");
    }

    #[tokio::test]
    async fn failed_mutation_leaves_the_issue_untouched() {
        let store = MemoryIssueStore::new();
        let issue = seed(&store, test_new_issue()).await;

        let err = store
            .mutate(issue.id, &mut |issue| {
                issue.apply_transition(IssueStatus::Resolved, Uuid::new_v4(), "", Utc::now());
                Err(CivicError::Validation("rejected mid-apply".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CivicError::Validation(_)));

        let fresh = store.get(issue.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, IssueStatus::Pending);
        assert_eq!(fresh.timeline.len(), 1);
    }

    #[tokio::test]
    async fn list_respects_status_filter_and_offset() {
        let store = MemoryIssueStore::new();
        let resolved = seed(&store, test_new_issue()).await;
        store
            .mutate(resolved.id, &mut |issue| {
                issue.apply_transition(IssueStatus::Resolved, Uuid::new_v4(), "", Utc::now());
                Ok(())
            })
            .await
            .unwrap();
        seed(&store, test_new_issue()).await;

        let filter =
            IssueFilter { status: Some(IssueStatus::Pending), ..Default::default() };
        let page = store.list(&filter, IssueSort::Newest, 0, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].status, IssueStatus::Pending);

        let empty = store.list(&filter, IssueSort::Newest, 1, 10).await.unwrap();
        assert!(empty.is_empty());
    }

    async fn seed_job(store: &MemoryNotificationStore, recipient: Uuid) -> NotificationJob {
        let job = NotificationJob::from_draft(test_draft(recipient), Utc::now()).unwrap();
        store.insert(job.clone()).await.unwrap();
        job
    }

    #[tokio::test]
    async fn claim_due_hands_each_job_to_one_caller() {
        let store = MemoryNotificationStore::new();
        let recipient = Uuid::new_v4();
        for _ in 0..10 {
            seed_job(&store, recipient).await;
        }

        let now = Utc::now();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.claim_due(now, 100).await.unwrap() }));
        }

        let mut all_claimed = Vec::new();
        for handle in handles {
            all_claimed.extend(handle.await.unwrap().into_iter().map(|j| j.id));
        }
        all_claimed.sort();
        all_claimed.dedup();
        assert_eq!(all_claimed.len(), 10, "every job claimed exactly once");

        // Nothing left to claim.
        assert!(store.claim_due(now, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_is_a_noop_after_claim() {
        let store = MemoryNotificationStore::new();
        let job = seed_job(&store, Uuid::new_v4()).await;

        let claimed = store.claim_due(Utc::now(), 10).await.unwrap();
        assert_eq!(claimed.len(), 1);

        assert!(!store.cancel(job.id).await.unwrap());
        assert!(store.get(job.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cancel_removes_pending_jobs() {
        let store = MemoryNotificationStore::new();
        let job = seed_job(&store, Uuid::new_v4()).await;
        assert!(store.cancel(job.id).await.unwrap());
        assert!(store.get(job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scheduled_jobs_stay_unclaimed_until_due() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let mut draft = test_draft(Uuid::new_v4());
        draft.scheduled_for = Some(now + chrono::Duration::hours(24));
        let job = NotificationJob::from_draft(draft, now).unwrap();
        store.insert(job).await.unwrap();

        assert!(store.claim_due(now, 10).await.unwrap().is_empty());
        assert_eq!(
            store.claim_due(now + chrono::Duration::hours(25), 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn delete_removes_jobs_in_any_state() {
        let store = MemoryNotificationStore::new();
        let job = seed_job(&store, Uuid::new_v4()).await;
        store.claim_due(Utc::now(), 10).await.unwrap();

        // Claimed jobs resist cancel but not delete.
        assert!(!store.cancel(job.id).await.unwrap());
        assert!(store.delete(job.id).await.unwrap());
        assert!(store.get(job.id).await.unwrap().is_none());
        assert!(!store.delete(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn unread_count_and_mark_all_read() {
        let store = MemoryNotificationStore::new();
        let recipient = Uuid::new_v4();
        seed_job(&store, recipient).await;
        seed_job(&store, recipient).await;
        seed_job(&store, Uuid::new_v4()).await;

        assert_eq!(store.unread_count(recipient).await.unwrap(), 2);
        assert_eq!(store.mark_all_read(recipient, Utc::now()).await.unwrap(), 2);
        assert_eq!(store.unread_count(recipient).await.unwrap(), 0);
        // Idempotent second pass.
        assert_eq!(store.mark_all_read(recipient, Utc::now()).await.unwrap(), 0);
    }
}
