//! Orchestrates the issue lifecycle: intake with classification, status
//! transitions with audit and notification triggers, assignment, engagement
//! and feedback.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use civicsignal_common::{Actor, CivicError, GeoPoint, IssueStatus, Language, Priority};

use crate::classify::Classifier;
use crate::events::{DomainEvent, EventBus};
use crate::issue::{
    AiAnalysis, EngagementKind, Feedback, Issue, IssuePatch, MediaKind, MediaRef, NewIssue,
};
use crate::notification::{
    Channel, NotificationDraft, NotificationKind, NotificationPayload,
};
use crate::notify::dispatcher::Dispatcher;
use crate::scoring::{self, IssueStats, TRENDING_WINDOW_DAYS};
use crate::store::{IssueFilter, IssueSort, IssueStore, Visibility};
use crate::transcribe::Transcriber;

const FEEDBACK_REQUEST_DELAY_HOURS: i64 = 24;

pub struct LifecycleEngine {
    issues: Arc<dyn IssueStore>,
    classifier: Classifier,
    dispatcher: Arc<Dispatcher>,
    transcriber: Arc<dyn Transcriber>,
    events: EventBus,
}

impl LifecycleEngine {
    pub fn new(
        issues: Arc<dyn IssueStore>,
        classifier: Classifier,
        dispatcher: Arc<Dispatcher>,
        transcriber: Arc<dyn Transcriber>,
        events: EventBus,
    ) -> Self {
        Self { issues, classifier, dispatcher, transcriber, events }
    }

    /// Visibility rule shared by reads: anonymous viewers see public issues,
    /// reporters additionally see their own, officials see everything.
    pub fn visibility_for(viewer: Option<&Actor>) -> Visibility {
        match viewer {
            None => Visibility::PublicOnly,
            Some(actor) if actor.role.can_manage_issues() => Visibility::All,
            Some(actor) => Visibility::PublicOrReporter(actor.user_id),
        }
    }

    /// Intake: classify the text, fill whatever the reporter left blank, and
    /// persist the issue with its creation audit entry.
    #[instrument(skip_all, fields(reporter = %actor.user_id))]
    pub async fn create_issue(&self, actor: &Actor, mut input: NewIssue) -> Result<Issue, CivicError> {
        let now = Utc::now();
        let text = format!("{} {}", input.title, input.description);
        let classification = self.classifier.classify(&text, Some(&input.location.point));

        if input.category.is_none() {
            input.category = Some(classification.category);
        }
        if input.subcategory.is_none() {
            input.subcategory = Some(classification.subcategory.clone());
        }
        if input.priority.is_none() {
            input.priority = Some(classification.priority);
        }

        let analysis = AiAnalysis {
            sentiment: classification.sentiment,
            urgency_score: classification.urgency_score,
            keywords: classification.keywords,
            confidence: classification.confidence,
            classified_at: now,
        };

        let issue = Issue::create(input, actor.user_id, Some(analysis), now)?;
        self.issues.insert(issue.clone()).await?;
        self.events.publish(DomainEvent::IssueCreated {
            issue_id: issue.id,
            reporter: issue.reporter,
        });
        info!(issue_id = %issue.id, category = %issue.category, urgent = issue.is_urgent, "issue created");
        Ok(issue)
    }

    /// Voice intake: transcribe first, then run the normal pipeline with the
    /// transcript as the description and the recording attached as media.
    pub async fn create_issue_from_voice(
        &self,
        actor: &Actor,
        audio_url: &str,
        title: String,
        language: Language,
        mut input: NewIssue,
    ) -> Result<Issue, CivicError> {
        let transcript = self.transcriber.transcribe(audio_url, language).await?;
        input.title = title;
        input.description = transcript;
        input.language = Some(language);
        input.media.push(MediaRef { kind: MediaKind::Audio, url: audio_url.to_string() });
        self.create_issue(actor, input).await
    }

    /// Fetch one issue, hiding private issues from everyone but their
    /// reporter and elevated roles.
    pub async fn get_issue(&self, id: Uuid, viewer: Option<&Actor>) -> Result<Issue, CivicError> {
        let issue = self
            .issues
            .get(id)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("issue {id}")))?;

        if !issue.is_public {
            let allowed = viewer.map_or(false, |actor| {
                actor.role.can_manage_issues() || actor.user_id == issue.reporter
            });
            if !allowed {
                // Hidden, not forbidden: private issues do not leak existence.
                return Err(CivicError::NotFound(format!("issue {id}")));
            }
        }
        Ok(issue)
    }

    /// Move an issue to a new status. Officials only. Resolving triggers the
    /// resolved notification plus a feedback request held for 24 hours; every
    /// other change sends a plain status update.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn transition(
        &self,
        actor: &Actor,
        issue_id: Uuid,
        new_status: IssueStatus,
        notes: &str,
    ) -> Result<Issue, CivicError> {
        if !actor.role.can_manage_issues() {
            return Err(CivicError::Forbidden(
                "only officials can change issue status".into(),
            ));
        }

        let mut old_status = None;
        let issue = self
            .issues
            .mutate(issue_id, &mut |issue| {
                old_status = Some(issue.status);
                issue.apply_transition(new_status, actor.user_id, notes, Utc::now());
                Ok(())
            })
            .await?;
        let old_status = old_status.unwrap_or(issue.status);
        self.events.publish(DomainEvent::IssueStatusChanged {
            issue_id,
            old_status,
            new_status,
        });

        if new_status == IssueStatus::Resolved {
            self.notify_reporter(&issue, actor, NotificationKind::IssueResolved, "समस्या हल")
                .await?;
            self.schedule_feedback_request(&issue, actor).await?;
        } else {
            self.notify_reporter(&issue, actor, NotificationKind::IssueUpdate, "रिपोर्ट अपडेट")
                .await?;
        }

        info!(issue_id = %issue_id, from = %old_status, to = %new_status, "status changed");
        Ok(issue)
    }

    /// Assign an issue to an official and notify them.
    pub async fn assign(
        &self,
        actor: &Actor,
        issue_id: Uuid,
        assignee: Uuid,
    ) -> Result<Issue, CivicError> {
        if !actor.role.can_manage_issues() {
            return Err(CivicError::Forbidden("only officials can assign issues".into()));
        }

        let issue = self
            .issues
            .mutate(issue_id, &mut |issue| {
                issue.apply_assignment(assignee, actor.user_id, Utc::now());
                Ok(())
            })
            .await?;
        self.events.publish(DomainEvent::IssueAssigned { issue_id, assignee });

        self.dispatcher
            .send_now(NotificationDraft {
                recipient: assignee,
                sender: Some(actor.user_id),
                kind: NotificationKind::Assignment,
                title: "नई जिम्मेदारी".to_string(),
                body: format!("आपको रिपोर्ट {} सौंपी गई है।", issue.id),
                payload: Some(NotificationPayload {
                    issue_id: Some(issue.id),
                    ..Default::default()
                }),
                channels: vec![Channel::Push, Channel::InApp],
                priority: issue.priority,
                language: issue.language,
                scheduled_for: None,
            })
            .await?;

        Ok(issue)
    }

    /// Partial edit by the reporter or an official.
    pub async fn update_issue(
        &self,
        actor: &Actor,
        issue_id: Uuid,
        patch: IssuePatch,
    ) -> Result<Issue, CivicError> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() || title.chars().count() > 200 {
                return Err(CivicError::Validation("title must be 1-200 characters".into()));
            }
        }
        if let Some(description) = &patch.description {
            if description.trim().is_empty() || description.chars().count() > 2000 {
                return Err(CivicError::Validation(
                    "description must be 1-2000 characters".into(),
                ));
            }
        }

        let issue = self
            .issues
            .mutate(issue_id, &mut |issue| {
                if issue.reporter != actor.user_id && !actor.role.can_manage_issues() {
                    return Err(CivicError::Forbidden(
                        "only the reporter or an official can edit an issue".into(),
                    ));
                }
                issue.apply_patch(patch.clone(), Utc::now());
                Ok(())
            })
            .await?;
        Ok(issue)
    }

    /// Bump one engagement counter. Open to any caller; counters only go up.
    pub async fn record_engagement(
        &self,
        issue_id: Uuid,
        kind: EngagementKind,
    ) -> Result<Issue, CivicError> {
        let issue = self.issues.bump_engagement(issue_id, kind).await?;
        self.events.publish(DomainEvent::EngagementRecorded { issue_id, kind });
        Ok(issue)
    }

    /// Reporter feedback, accepted only once the issue is resolved.
    pub async fn submit_feedback(
        &self,
        actor: &Actor,
        issue_id: Uuid,
        rating: u8,
        comment: Option<String>,
        helpful: bool,
    ) -> Result<Issue, CivicError> {
        let issue = self
            .issues
            .mutate(issue_id, &mut |issue| {
                if issue.reporter != actor.user_id {
                    return Err(CivicError::Forbidden(
                        "only the reporter can leave feedback".into(),
                    ));
                }
                if issue.status != IssueStatus::Resolved {
                    return Err(CivicError::Validation(
                        "feedback is only accepted on resolved issues".into(),
                    ));
                }
                let now = Utc::now();
                issue.set_feedback(
                    Feedback { rating, comment: comment.clone(), submitted_at: now, helpful },
                    now,
                )
            })
            .await?;
        self.events.publish(DomainEvent::FeedbackSubmitted { issue_id, rating });
        Ok(issue)
    }

    pub async fn list_issues(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError> {
        self.issues.list(filter, sort, offset, limit).await
    }

    pub async fn count_issues(&self, filter: &IssueFilter) -> Result<u64, CivicError> {
        self.issues.count(filter).await
    }

    pub async fn nearby_issues(
        &self,
        point: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Issue>, CivicError> {
        self.issues.nearby(point, radius_km, limit).await
    }

    /// Highest-engagement public issues from the trailing week.
    pub async fn trending_issues(&self, limit: usize) -> Result<Vec<Issue>, CivicError> {
        let now = Utc::now();
        let cutoff = now - Duration::days(TRENDING_WINDOW_DAYS);
        let recent = self.issues.created_since(cutoff).await?;
        let public: Vec<Issue> = recent.into_iter().filter(|i| i.is_public).collect();
        Ok(scoring::trending(public, now, limit))
    }

    /// Aggregates cover public issues only; private reports never show up in
    /// the counts.
    pub async fn stats(&self) -> Result<IssueStats, CivicError> {
        let issues = self.issues.all().await?;
        let public: Vec<Issue> = issues.into_iter().filter(|i| i.is_public).collect();
        Ok(scoring::compute_stats(&public, Utc::now()))
    }

    async fn notify_reporter(
        &self,
        issue: &Issue,
        actor: &Actor,
        kind: NotificationKind,
        title: &str,
    ) -> Result<(), CivicError> {
        self.dispatcher
            .send_now(NotificationDraft {
                recipient: issue.reporter,
                sender: Some(actor.user_id),
                kind,
                title: title.to_string(),
                body: title.to_string(),
                payload: Some(NotificationPayload {
                    issue_id: Some(issue.id),
                    issue_status: Some(issue.status),
                    ..Default::default()
                }),
                channels: vec![Channel::Push, Channel::InApp],
                priority: issue.priority,
                language: issue.language,
                scheduled_for: None,
            })
            .await?;
        Ok(())
    }

    async fn schedule_feedback_request(
        &self,
        issue: &Issue,
        actor: &Actor,
    ) -> Result<(), CivicError> {
        self.dispatcher
            .schedule(NotificationDraft {
                recipient: issue.reporter,
                sender: Some(actor.user_id),
                kind: NotificationKind::FeedbackRequest,
                title: "फीडबैक अनुरोध".to_string(),
                body: "फीडबैक अनुरोध".to_string(),
                payload: Some(NotificationPayload {
                    issue_id: Some(issue.id),
                    issue_status: Some(issue.status),
                    ..Default::default()
                }),
                channels: vec![Channel::Push, Channel::InApp],
                priority: Priority::Low,
                language: issue.language,
                scheduled_for: Some(Utc::now() + Duration::hours(FEEDBACK_REQUEST_DELAY_HOURS)),
            })
            .await?;
        Ok(())
    }
}
