//! Durable notification scheduler. Scheduled jobs live in the store, not in
//! timers, so they survive restarts; each poll claims due jobs atomically and
//! hands them to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use civicsignal_common::CivicError;

use crate::notify::dispatcher::Dispatcher;
use crate::store::NotificationStore;

const CLAIM_BATCH: usize = 50;

pub struct Scheduler {
    store: Arc<dyn NotificationStore>,
    dispatcher: Arc<Dispatcher>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        dispatcher: Arc<Dispatcher>,
        poll_interval: Duration,
    ) -> Self {
        Self { store, dispatcher, poll_interval }
    }

    /// One poll: claim everything due, dispatch each claimed job. Returns how
    /// many jobs were dispatched. Dispatch failures are logged and do not
    /// abort the rest of the batch.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize, CivicError> {
        let claimed = self.store.claim_due(now, CLAIM_BATCH).await?;
        let count = claimed.len();

        for job in claimed {
            let id = job.id;
            if let Err(err) = self.dispatcher.dispatch(job).await {
                error!(notification_id = %id, error = %err, "scheduled dispatch failed");
            }
        }

        if count > 0 {
            info!(dispatched = count, "scheduler tick");
        }
        Ok(count)
    }

    /// Poll forever. Intended to be spawned as a background task.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            if let Err(err) = self.tick(Utc::now()).await {
                error!(error = %err, "scheduler tick failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::notification::{Channel, DeliveryStatus};
    use crate::notify::noop::NoopProvider;
    use crate::notify::template::TemplateRegistry;
    use crate::store::MemoryNotificationStore;
    use crate::testutil::test_draft;
    use uuid::Uuid;

    fn setup() -> (Arc<MemoryNotificationStore>, Scheduler, Arc<Dispatcher>) {
        let store = Arc::new(MemoryNotificationStore::new());
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            vec![
                Arc::new(NoopProvider::new(Channel::Push)),
                Arc::new(NoopProvider::new(Channel::InApp)),
            ],
            TemplateRegistry::new(),
            EventBus::new(),
        ));
        let scheduler =
            Scheduler::new(store.clone(), dispatcher.clone(), Duration::from_secs(15));
        (store, scheduler, dispatcher)
    }

    #[tokio::test]
    async fn due_jobs_are_dispatched_exactly_once() {
        let (store, scheduler, dispatcher) = setup();
        let now = Utc::now();

        let mut draft = test_draft(Uuid::new_v4());
        draft.scheduled_for = Some(now - chrono::Duration::minutes(1));
        let job = dispatcher.schedule(draft).await.unwrap();

        assert_eq!(scheduler.tick(now).await.unwrap(), 1);
        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Sent);

        // Already claimed and sent, a second tick finds nothing.
        assert_eq!(scheduler.tick(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn future_jobs_are_left_alone() {
        let (store, scheduler, dispatcher) = setup();
        let now = Utc::now();

        let mut draft = test_draft(Uuid::new_v4());
        draft.scheduled_for = Some(now + chrono::Duration::hours(24));
        let job = dispatcher.schedule(draft).await.unwrap();

        assert_eq!(scheduler.tick(now).await.unwrap(), 0);
        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Pending);

        assert_eq!(
            scheduler.tick(now + chrono::Duration::hours(25)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn cancelled_jobs_never_fire() {
        let (store, scheduler, dispatcher) = setup();
        let now = Utc::now();

        let mut draft = test_draft(Uuid::new_v4());
        draft.scheduled_for = Some(now + chrono::Duration::hours(1));
        let job = dispatcher.schedule(draft).await.unwrap();

        assert!(store.cancel(job.id).await.unwrap());
        assert_eq!(
            scheduler.tick(now + chrono::Duration::hours(2)).await.unwrap(),
            0
        );
    }
}
