//! Fan-out dispatcher: render once, deliver to every requested channel
//! concurrently, record the outcome in a single store write.
//!
//! A job is `sent` when at least one channel succeeds. Channel failures are
//! absorbed into the job's failure summary, never surfaced as call errors.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use civicsignal_common::CivicError;

use crate::events::{DomainEvent, EventBus};
use crate::notification::{Channel, DeliveryStatus, NotificationDraft, NotificationJob};
use crate::notify::provider::ChannelProvider;
use crate::notify::template::TemplateRegistry;
use crate::store::NotificationStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub sent: u64,
    pub failed: u64,
}

pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    providers: HashMap<Channel, Arc<dyn ChannelProvider>>,
    templates: TemplateRegistry,
    events: EventBus,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        providers: Vec<Arc<dyn ChannelProvider>>,
        templates: TemplateRegistry,
        events: EventBus,
    ) -> Self {
        let providers = providers.into_iter().map(|p| (p.channel(), p)).collect();
        Self { store, providers, templates, events }
    }

    /// Create the job and dispatch it immediately, bypassing the scheduler.
    /// The row is inserted pre-claimed so a concurrent scheduler tick cannot
    /// pick it up between insert and dispatch.
    pub async fn send_now(&self, draft: NotificationDraft) -> Result<NotificationJob, CivicError> {
        let now = Utc::now();
        let mut job = NotificationJob::from_draft(draft, now)?;
        job.claimed_at = Some(now);
        self.store.insert(job.clone()).await?;
        self.dispatch(job).await
    }

    /// Persist a job for the scheduler to claim once it comes due.
    pub async fn schedule(&self, draft: NotificationDraft) -> Result<NotificationJob, CivicError> {
        let job = NotificationJob::from_draft(draft, Utc::now())?;
        self.store.insert(job.clone()).await?;
        Ok(job)
    }

    /// One job per recipient; partial failure is reported in the counts, not
    /// as an error.
    pub async fn send_bulk(
        &self,
        recipients: &[Uuid],
        draft: NotificationDraft,
    ) -> Result<BulkOutcome, CivicError> {
        let mut outcome = BulkOutcome::default();
        for &recipient in recipients {
            let mut per_recipient = draft.clone();
            per_recipient.recipient = recipient;
            match self.send_now(per_recipient).await {
                Ok(job) if job.status == DeliveryStatus::Sent => outcome.sent += 1,
                Ok(_) => outcome.failed += 1,
                Err(err) => {
                    warn!(%recipient, error = %err, "bulk notification failed");
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Deliver an already-claimed job across its channels and persist the
    /// outcome. Returns the updated job.
    pub async fn dispatch(&self, mut job: NotificationJob) -> Result<NotificationJob, CivicError> {
        let message = self.templates.render(&job);

        let attempts = job.channels.iter().map(|&channel| {
            let message = &message;
            let job = &job;
            async move {
                match self.providers.get(&channel) {
                    Some(provider) => provider
                        .deliver(job, message)
                        .await
                        .map_err(|err| format!("{channel}: {err}")),
                    None => Err(format!("{channel}: no provider configured")),
                }
            }
        });

        let results = join_all(attempts).await;
        let failures: Vec<String> =
            results.iter().filter_map(|r| r.as_ref().err().cloned()).collect();
        let any_ok = results.iter().any(|r| r.is_ok());

        let now = Utc::now();
        if any_ok {
            job.mark_sent(now);
            if !failures.is_empty() {
                // Partial delivery: keep the summary without flipping state.
                job.failure_reason = Some(failures.join("; "));
            }
        } else {
            job.mark_failed(&failures.join("; "), now);
        }

        self.store.update(job.clone()).await?;
        self.events.publish(DomainEvent::NotificationDispatched {
            notification_id: job.id,
            status: job.status,
        });
        info!(
            notification_id = %job.id,
            status = %job.status,
            channels = job.channels.len(),
            failures = failures.len(),
            "notification dispatched"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::noop::NoopProvider;
    use crate::notify::provider::RenderedMessage;
    use crate::store::{MemoryNotificationStore, NotificationStore};
    use crate::testutil::test_draft;
    use async_trait::async_trait;

    struct FailingProvider(Channel);

    #[async_trait]
    impl ChannelProvider for FailingProvider {
        fn channel(&self) -> Channel {
            self.0
        }

        async fn deliver(
            &self,
            _job: &NotificationJob,
            _message: &RenderedMessage,
        ) -> Result<(), CivicError> {
            Err(CivicError::Delivery("gateway timeout".into()))
        }
    }

    fn dispatcher_with(
        store: Arc<MemoryNotificationStore>,
        providers: Vec<Arc<dyn ChannelProvider>>,
    ) -> Dispatcher {
        Dispatcher::new(store, providers, TemplateRegistry::new(), EventBus::new())
    }

    #[tokio::test]
    async fn one_working_channel_is_enough() {
        let store = Arc::new(MemoryNotificationStore::new());
        let dispatcher = dispatcher_with(
            store.clone(),
            vec![
                Arc::new(FailingProvider(Channel::Push)),
                Arc::new(NoopProvider::new(Channel::InApp)),
            ],
        );

        let job = dispatcher.send_now(test_draft(Uuid::new_v4())).await.unwrap();
        assert_eq!(job.status, DeliveryStatus::Sent);
        assert!(job.sent_at.is_some());
        // The push failure is recorded even though the job went out.
        assert!(job.failure_reason.as_deref().unwrap().contains("push"));

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn all_channels_failing_marks_the_job_failed() {
        let store = Arc::new(MemoryNotificationStore::new());
        let dispatcher = dispatcher_with(
            store.clone(),
            vec![Arc::new(FailingProvider(Channel::Push))],
        );

        let mut draft = test_draft(Uuid::new_v4());
        draft.channels = vec![Channel::Push, Channel::Sms];
        // No error from the call itself; the failure lives on the job.
        let job = dispatcher.send_now(draft).await.unwrap();
        assert_eq!(job.status, DeliveryStatus::Failed);
        assert_eq!(job.delivery_attempts, 1);
        let reason = job.failure_reason.unwrap();
        assert!(reason.contains("push"));
        assert!(reason.contains("sms: no provider configured"));
    }

    #[tokio::test]
    async fn send_now_claims_before_dispatch() {
        let store = Arc::new(MemoryNotificationStore::new());
        let dispatcher =
            dispatcher_with(store.clone(), vec![Arc::new(NoopProvider::new(Channel::Push))]);

        let mut draft = test_draft(Uuid::new_v4());
        draft.channels = vec![Channel::Push];
        let job = dispatcher.send_now(draft).await.unwrap();
        assert!(job.claimed_at.is_some());
        // Nothing left for a scheduler tick to pick up.
        assert!(store.claim_due(Utc::now(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_reports_partial_failure_in_counts() {
        let store = Arc::new(MemoryNotificationStore::new());
        let dispatcher = dispatcher_with(
            store.clone(),
            vec![Arc::new(NoopProvider::new(Channel::InApp))],
        );

        let recipients: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        let mut ok_draft = test_draft(Uuid::new_v4());
        ok_draft.channels = vec![Channel::InApp];
        let outcome = dispatcher.send_bulk(&recipients, ok_draft).await.unwrap();
        assert_eq!(outcome, BulkOutcome { sent: 3, failed: 0 });

        let mut bad_draft = test_draft(Uuid::new_v4());
        bad_draft.channels = vec![Channel::Voice];
        let outcome = dispatcher.send_bulk(&recipients, bad_draft).await.unwrap();
        assert_eq!(outcome, BulkOutcome { sent: 0, failed: 3 });
    }

    #[tokio::test]
    async fn scheduled_drafts_wait_for_the_scheduler() {
        let store = Arc::new(MemoryNotificationStore::new());
        let dispatcher =
            dispatcher_with(store.clone(), vec![Arc::new(NoopProvider::new(Channel::Push))]);

        let mut draft = test_draft(Uuid::new_v4());
        draft.scheduled_for = Some(Utc::now() + chrono::Duration::hours(24));
        let job = dispatcher.schedule(draft).await.unwrap();

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Pending);
        assert!(stored.claimed_at.is_none());
    }
}
