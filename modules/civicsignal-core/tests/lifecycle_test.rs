use std::sync::Arc;

use uuid::Uuid;

use civicsignal_common::{Actor, Category, IssueStatus, Language, Priority, Role};
use civicsignal_core::classify::Classifier;
use civicsignal_core::events::EventBus;
use civicsignal_core::issue::{EngagementKind, MediaKind, TimelineAction};
use civicsignal_core::lifecycle::LifecycleEngine;
use civicsignal_core::notification::{Channel, DeliveryStatus};
use civicsignal_core::notify::{Dispatcher, NoopProvider, TemplateRegistry};
use civicsignal_core::store::{
    MemoryIssueStore, MemoryNotificationStore, NotificationFilter, NotificationStore,
};
use civicsignal_core::testutil::{new_issue_at, test_new_issue};
use civicsignal_core::transcribe::FixedTranscriber;

fn engine() -> (LifecycleEngine, Arc<MemoryNotificationStore>) {
    let notifications = Arc::new(MemoryNotificationStore::new());
    let dispatcher = Arc::new(Dispatcher::new(
        notifications.clone(),
        vec![
            Arc::new(NoopProvider::new(Channel::Push)),
            Arc::new(NoopProvider::new(Channel::InApp)),
        ],
        TemplateRegistry::new(),
        EventBus::new(),
    ));
    let engine = LifecycleEngine::new(
        Arc::new(MemoryIssueStore::new()),
        Classifier::default(),
        dispatcher,
        Arc::new(FixedTranscriber::new("पानी की कमी है तुरंत ध्यान चाहिए")),
        EventBus::new(),
    );
    (engine, notifications)
}

fn citizen() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Citizen)
}

fn official() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Official)
}

#[tokio::test]
async fn full_lifecycle_builds_a_complete_timeline() {
    let (engine, notifications) = engine();
    let reporter = citizen();
    let handler = official();

    let issue = engine.create_issue(&reporter, test_new_issue()).await.unwrap();
    assert_eq!(issue.status, IssueStatus::Pending);

    engine
        .transition(&handler, issue.id, IssueStatus::Acknowledged, "team notified")
        .await
        .unwrap();
    engine
        .transition(&handler, issue.id, IssueStatus::InProgress, "crew on site")
        .await
        .unwrap();
    let resolved = engine
        .transition(&handler, issue.id, IssueStatus::Resolved, "pipe replaced")
        .await
        .unwrap();

    assert_eq!(resolved.status, IssueStatus::Resolved);
    assert!(resolved.actual_resolution.is_some());
    assert_eq!(resolved.resolution_notes.as_deref(), Some("pipe replaced"));

    let actions: Vec<TimelineAction> =
        resolved.timeline.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![
            TimelineAction::Created,
            TimelineAction::Acknowledged,
            TimelineAction::InProgress,
            TimelineAction::Resolved,
        ]
    );

    // Two updates, one resolved, one scheduled feedback request.
    let to_reporter = NotificationFilter {
        recipient: Some(reporter.user_id),
        ..Default::default()
    };
    let jobs = notifications.list(&to_reporter, 0, 50).await.unwrap();
    assert_eq!(jobs.len(), 4);

    let pending: Vec<_> =
        jobs.iter().filter(|job| job.status == DeliveryStatus::Pending).collect();
    assert_eq!(pending.len(), 1, "only the feedback request is still held");
    assert!(pending[0].scheduled_for.is_some());
}

#[tokio::test]
async fn citizens_cannot_change_status() {
    let (engine, _) = engine();
    let reporter = citizen();
    let issue = engine.create_issue(&reporter, test_new_issue()).await.unwrap();

    let err = engine
        .transition(&reporter, issue.id, IssueStatus::Resolved, "")
        .await
        .unwrap_err();
    assert!(matches!(err, civicsignal_common::CivicError::Forbidden(_)));

    // Nothing was mutated.
    let fresh = engine.get_issue(issue.id, Some(&reporter)).await.unwrap();
    assert_eq!(fresh.status, IssueStatus::Pending);
    assert_eq!(fresh.timeline.len(), 1);
}

#[tokio::test]
async fn classification_fills_blank_fields_at_intake() {
    let (engine, _) = engine();
    let mut input = test_new_issue();
    input.title = "पानी की कमी".to_string();
    input.description = "पानी की कमी है, तुरंत ध्यान चाहिए".to_string();
    input.category = None;
    input.subcategory = None;
    input.priority = None;

    let issue = engine.create_issue(&citizen(), input).await.unwrap();
    assert_eq!(issue.category, Category::Water);
    assert_eq!(issue.subcategory, "shortage");
    assert_eq!(issue.priority, Priority::Critical);
    let analysis = issue.ai_analysis.unwrap();
    assert!(analysis.urgency_score >= 80);
}

#[tokio::test]
async fn reporter_supplied_fields_win_over_the_classifier() {
    let (engine, _) = engine();
    let mut input = test_new_issue();
    input.description = "पानी की कमी है".to_string();
    input.category = Some(Category::Roads);
    input.priority = Some(Priority::Low);

    let issue = engine.create_issue(&citizen(), input).await.unwrap();
    assert_eq!(issue.category, Category::Roads);
    assert_eq!(issue.priority, Priority::Low);
    // Analysis is still attached for audit.
    assert!(issue.ai_analysis.is_some());
}

#[tokio::test]
async fn voice_intake_transcribes_and_attaches_the_recording() {
    let (engine, _) = engine();
    let mut input = test_new_issue();
    input.category = None;
    input.priority = None;

    let issue = engine
        .create_issue_from_voice(
            &citizen(),
            "https://media.example/report.ogg",
            "पानी की शिकायत".to_string(),
            Language::Hindi,
            input,
        )
        .await
        .unwrap();

    assert_eq!(issue.description, "पानी की कमी है तुरंत ध्यान चाहिए");
    assert_eq!(issue.category, Category::Water);
    let audio = issue.media.iter().find(|m| m.kind == MediaKind::Audio).unwrap();
    assert_eq!(audio.url, "https://media.example/report.ogg");
}

#[tokio::test]
async fn private_issues_hide_from_strangers() {
    let (engine, _) = engine();
    let reporter = citizen();
    let mut input = test_new_issue();
    input.is_public = false;
    let issue = engine.create_issue(&reporter, input).await.unwrap();

    let stranger = citizen();
    assert!(matches!(
        engine.get_issue(issue.id, Some(&stranger)).await,
        Err(civicsignal_common::CivicError::NotFound(_))
    ));
    assert!(engine.get_issue(issue.id, None).await.is_err());

    assert!(engine.get_issue(issue.id, Some(&reporter)).await.is_ok());
    assert!(engine.get_issue(issue.id, Some(&official())).await.is_ok());
}

#[tokio::test]
async fn assignment_notifies_the_assignee() {
    let (engine, notifications) = engine();
    let handler = official();
    let assignee = Uuid::new_v4();
    let issue = engine.create_issue(&citizen(), test_new_issue()).await.unwrap();

    let assigned = engine.assign(&handler, issue.id, assignee).await.unwrap();
    assert_eq!(assigned.assigned_to, Some(assignee));
    assert_eq!(assigned.timeline.last().unwrap().action, TimelineAction::Assigned);

    let filter = NotificationFilter { recipient: Some(assignee), ..Default::default() };
    let jobs = notifications.list(&filter, 0, 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, DeliveryStatus::Sent);
}

#[tokio::test]
async fn feedback_requires_the_reporter_and_a_resolved_issue() {
    let (engine, _) = engine();
    let reporter = citizen();
    let handler = official();
    let issue = engine.create_issue(&reporter, test_new_issue()).await.unwrap();

    // Not resolved yet.
    let err = engine
        .submit_feedback(&reporter, issue.id, 4, None, true)
        .await
        .unwrap_err();
    assert!(matches!(err, civicsignal_common::CivicError::Validation(_)));

    engine
        .transition(&handler, issue.id, IssueStatus::Resolved, "")
        .await
        .unwrap();

    // Wrong author.
    let err = engine
        .submit_feedback(&citizen(), issue.id, 4, None, true)
        .await
        .unwrap_err();
    assert!(matches!(err, civicsignal_common::CivicError::Forbidden(_)));

    let with_feedback = engine
        .submit_feedback(&reporter, issue.id, 5, Some("quick work".into()), true)
        .await
        .unwrap();
    assert_eq!(with_feedback.feedback.unwrap().rating, 5);
}

#[tokio::test]
async fn trending_ranks_recent_public_issues_by_engagement() {
    let (engine, _) = engine();
    let reporter = citizen();

    let quiet = engine
        .create_issue(&reporter, new_issue_at(77.17, 31.10, "quiet"))
        .await
        .unwrap();
    let busy = engine
        .create_issue(&reporter, new_issue_at(77.18, 31.11, "busy"))
        .await
        .unwrap();
    for _ in 0..5 {
        engine.record_engagement(busy.id, EngagementKind::Upvotes).await.unwrap();
    }
    engine.record_engagement(quiet.id, EngagementKind::Views).await.unwrap();

    let ranked = engine.trending_issues(10).await.unwrap();
    assert_eq!(ranked[0].id, busy.id);

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transitions_keep_every_timeline_entry() {
    let (engine, _) = engine();
    let handler = official();
    let issue = engine.create_issue(&citizen(), test_new_issue()).await.unwrap();

    let engine = Arc::new(engine);
    let mut handles = Vec::new();
    for _ in 0..24 {
        let engine = engine.clone();
        let id = issue.id;
        handles.push(tokio::spawn(async move {
            engine
                .transition(&handler, id, IssueStatus::Acknowledged, "checked")
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let fresh = engine.get_issue(issue.id, None).await.unwrap();
    assert_eq!(fresh.timeline.len(), 25, "creation entry plus one per transition");
}

#[tokio::test]
async fn stats_cover_public_issues_only() {
    let (engine, _) = engine();
    let reporter = citizen();
    engine.create_issue(&reporter, test_new_issue()).await.unwrap();

    let mut input = test_new_issue();
    input.is_public = false;
    engine.create_issue(&reporter, input).await.unwrap();

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total, 1, "private reports stay out of the aggregates");
}
