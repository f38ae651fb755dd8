use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use civicsignal_common::{Actor, IssueStatus, Language, Role};
use civicsignal_core::classify::Classifier;
use civicsignal_core::events::{DomainEvent, EventBus};
use civicsignal_core::lifecycle::LifecycleEngine;
use civicsignal_core::notification::{Channel, DeliveryStatus, NotificationKind};
use civicsignal_core::notify::{Dispatcher, NoopProvider, Scheduler, TemplateRegistry};
use civicsignal_core::store::{
    MemoryIssueStore, MemoryNotificationStore, NotificationFilter, NotificationStore,
};
use civicsignal_core::testutil::{test_draft, test_new_issue};
use civicsignal_core::transcribe::FixedTranscriber;

struct Harness {
    engine: LifecycleEngine,
    dispatcher: Arc<Dispatcher>,
    scheduler: Scheduler,
    notifications: Arc<MemoryNotificationStore>,
    events: EventBus,
}

fn harness() -> Harness {
    let notifications = Arc::new(MemoryNotificationStore::new());
    let events = EventBus::new();
    let dispatcher = Arc::new(Dispatcher::new(
        notifications.clone(),
        vec![
            Arc::new(NoopProvider::new(Channel::Push)),
            Arc::new(NoopProvider::new(Channel::InApp)),
        ],
        TemplateRegistry::new(),
        events.clone(),
    ));
    let scheduler = Scheduler::new(
        notifications.clone(),
        dispatcher.clone(),
        Duration::from_secs(15),
    );
    let engine = LifecycleEngine::new(
        Arc::new(MemoryIssueStore::new()),
        Classifier::default(),
        dispatcher.clone(),
        Arc::new(FixedTranscriber::new("transcript")),
        events.clone(),
    );
    Harness { engine, dispatcher, scheduler, notifications, events }
}

#[tokio::test]
async fn feedback_request_fires_only_after_its_hold_time() {
    let h = harness();
    let reporter = Actor::new(Uuid::new_v4(), Role::Citizen);
    let handler = Actor::new(Uuid::new_v4(), Role::Official);

    let issue = h.engine.create_issue(&reporter, test_new_issue()).await.unwrap();
    h.engine
        .transition(&handler, issue.id, IssueStatus::Resolved, "done")
        .await
        .unwrap();

    let feedback_filter = NotificationFilter {
        recipient: Some(reporter.user_id),
        kind: Some(NotificationKind::FeedbackRequest),
        ..Default::default()
    };

    let now = Utc::now();
    assert_eq!(h.scheduler.tick(now).await.unwrap(), 0, "held for 24 hours");

    let later = now + chrono::Duration::hours(25);
    assert_eq!(h.scheduler.tick(later).await.unwrap(), 1);

    let jobs = h.notifications.list(&feedback_filter, 0, 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, DeliveryStatus::Sent);
}

#[tokio::test]
async fn dispatch_publishes_a_domain_event() {
    let h = harness();
    let mut events = h.events.subscribe();

    let job = h.dispatcher.send_now(test_draft(Uuid::new_v4())).await.unwrap();

    match events.recv().await.unwrap() {
        DomainEvent::NotificationDispatched { notification_id, status } => {
            assert_eq!(notification_id, job.id);
            assert_eq!(status, DeliveryStatus::Sent);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn rendered_body_follows_the_recipient_language() {
    let h = harness();
    let reporter = Actor::new(Uuid::new_v4(), Role::Citizen);
    let handler = Actor::new(Uuid::new_v4(), Role::Official);

    let mut input = test_new_issue();
    input.language = Some(Language::English);
    let issue = h.engine.create_issue(&reporter, input).await.unwrap();
    h.engine
        .transition(&handler, issue.id, IssueStatus::Acknowledged, "")
        .await
        .unwrap();

    let filter = NotificationFilter {
        recipient: Some(reporter.user_id),
        kind: Some(NotificationKind::IssueUpdate),
        ..Default::default()
    };
    let jobs = h.notifications.list(&filter, 0, 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].language, Language::English);
    assert_eq!(
        jobs[0].payload.as_ref().unwrap().issue_status,
        Some(IssueStatus::Acknowledged)
    );
}

#[tokio::test]
async fn bulk_send_creates_one_job_per_recipient() {
    let h = harness();
    let recipients: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

    let mut draft = test_draft(Uuid::new_v4());
    draft.kind = NotificationKind::UrgentAlert;
    let outcome = h.dispatcher.send_bulk(&recipients, draft).await.unwrap();
    assert_eq!(outcome.sent, 4);
    assert_eq!(outcome.failed, 0);

    for recipient in recipients {
        let filter = NotificationFilter { recipient: Some(recipient), ..Default::default() };
        assert_eq!(h.notifications.count(&filter).await.unwrap(), 1);
    }
}

#[tokio::test]
async fn cancelled_feedback_request_never_sends() {
    let h = harness();
    let mut draft = test_draft(Uuid::new_v4());
    draft.kind = NotificationKind::FeedbackRequest;
    draft.scheduled_for = Some(Utc::now() + chrono::Duration::hours(24));
    let job = h.dispatcher.schedule(draft).await.unwrap();

    assert!(h.notifications.cancel(job.id).await.unwrap());

    let later = Utc::now() + chrono::Duration::hours(48);
    assert_eq!(h.scheduler.tick(later).await.unwrap(), 0);
    assert!(h.notifications.get(job.id).await.unwrap().is_none());
}
