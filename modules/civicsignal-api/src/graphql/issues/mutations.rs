use std::sync::Arc;

use async_graphql::*;
use uuid::Uuid;

use civicsignal_common::{Category, GeoPoint, IssueStatus, Language, Priority};
use civicsignal_core::issue::{
    EngagementKind, IssueLocation, IssuePatch, MediaKind, MediaRef, NewIssue,
};

use crate::graphql::context;
use crate::graphql::error;
use crate::ApiDeps;

use super::types::{GqlIssue, IssuePatchInput, LocationInput, MediaInput, NewIssueInput};

fn location_from_input(input: LocationInput) -> Result<IssueLocation> {
    let point = GeoPoint::new(input.longitude, input.latitude).map_err(error::from_civic)?;
    Ok(IssueLocation {
        point,
        address: input.address,
        locality: input.locality,
        district: input.district,
        state: input.state,
        pincode: input.pincode,
    })
}

fn media_from_input(media: Option<Vec<MediaInput>>) -> Result<Vec<MediaRef>> {
    media
        .unwrap_or_default()
        .into_iter()
        .map(|m| {
            Ok(MediaRef {
                kind: MediaKind::parse(&m.kind).map_err(error::from_civic)?,
                url: m.url,
            })
        })
        .collect()
}

fn new_issue_from_input(input: NewIssueInput) -> Result<NewIssue> {
    Ok(NewIssue {
        title: input.title,
        description: input.description,
        category: input
            .category
            .as_deref()
            .map(Category::parse)
            .transpose()
            .map_err(error::from_civic)?,
        subcategory: input.subcategory,
        priority: input
            .priority
            .as_deref()
            .map(Priority::parse)
            .transpose()
            .map_err(error::from_civic)?,
        language: input.language.as_deref().map(Language::from_str_loose),
        location: location_from_input(input.location)?,
        media: media_from_input(input.media)?,
        tags: input.tags.unwrap_or_default(),
        is_public: input.is_public.unwrap_or(true),
    })
}

#[derive(InputObject)]
pub struct VoiceIssueInput {
    pub audio_url: String,
    pub title: String,
    pub language: Option<String>,
    pub location: LocationInput,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Default)]
pub struct IssueMutation;

#[Object]
impl IssueMutation {
    /// Report a new issue. Blank category/priority are filled by the
    /// classifier.
    async fn create_issue(&self, ctx: &Context<'_>, input: NewIssueInput) -> Result<GqlIssue> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        tracing::info!(reporter = %actor.user_id, "graphql.create_issue");

        let issue = deps
            .engine
            .create_issue(&actor, new_issue_from_input(input)?)
            .await
            .map_err(error::from_civic)?;
        Ok(GqlIssue::from(issue))
    }

    /// Report an issue from a voice recording. The transcript becomes the
    /// description and the recording is attached as media.
    async fn create_voice_issue(
        &self,
        ctx: &Context<'_>,
        input: VoiceIssueInput,
    ) -> Result<GqlIssue> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        tracing::info!(reporter = %actor.user_id, "graphql.create_voice_issue");

        let language = input
            .language
            .as_deref()
            .map(Language::from_str_loose)
            .unwrap_or_default();
        let base = NewIssue {
            title: String::new(),
            description: String::new(),
            category: None,
            subcategory: None,
            priority: None,
            language: Some(language),
            location: location_from_input(input.location)?,
            media: vec![],
            tags: input.tags.unwrap_or_default(),
            is_public: input.is_public.unwrap_or(true),
        };

        let issue = deps
            .engine
            .create_issue_from_voice(&actor, &input.audio_url, input.title, language, base)
            .await
            .map_err(error::from_civic)?;
        Ok(GqlIssue::from(issue))
    }

    /// Change an issue's status. Officials only; regressions are allowed and
    /// audited.
    async fn update_issue_status(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        status: String,
        notes: Option<String>,
    ) -> Result<GqlIssue> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        tracing::info!(id = %id, status = %status, "graphql.update_issue_status");

        let new_status = IssueStatus::parse(&status).map_err(error::from_civic)?;
        let issue = deps
            .engine
            .transition(&actor, id, new_status, notes.as_deref().unwrap_or(""))
            .await
            .map_err(error::from_civic)?;
        Ok(GqlIssue::from(issue))
    }

    /// Assign an issue to an official.
    async fn assign_issue(&self, ctx: &Context<'_>, id: Uuid, assignee: Uuid) -> Result<GqlIssue> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;
        tracing::info!(id = %id, assignee = %assignee, "graphql.assign_issue");

        let issue = deps
            .engine
            .assign(&actor, id, assignee)
            .await
            .map_err(error::from_civic)?;
        Ok(GqlIssue::from(issue))
    }

    /// Partial edit by the reporter or an official.
    async fn update_issue(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        patch: IssuePatchInput,
    ) -> Result<GqlIssue> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;

        let patch = IssuePatch {
            title: patch.title,
            description: patch.description,
            category: patch
                .category
                .as_deref()
                .map(Category::parse)
                .transpose()
                .map_err(error::from_civic)?,
            subcategory: patch.subcategory,
            priority: patch
                .priority
                .as_deref()
                .map(Priority::parse)
                .transpose()
                .map_err(error::from_civic)?,
            tags: patch.tags,
            is_public: patch.is_public,
            estimated_resolution: patch.estimated_resolution,
        };
        let issue = deps
            .engine
            .update_issue(&actor, id, patch)
            .await
            .map_err(error::from_civic)?;
        Ok(GqlIssue::from(issue))
    }

    /// Bump one engagement counter: views, upvotes, downvotes, shares or
    /// comments.
    async fn record_engagement(&self, ctx: &Context<'_>, id: Uuid, kind: String) -> Result<GqlIssue> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();

        let kind = match kind.to_lowercase().as_str() {
            "views" => EngagementKind::Views,
            "upvotes" => EngagementKind::Upvotes,
            "downvotes" => EngagementKind::Downvotes,
            "shares" => EngagementKind::Shares,
            "comments" => EngagementKind::Comments,
            other => return Err(Error::new(format!("unknown engagement kind: {other}"))),
        };
        let issue = deps
            .engine
            .record_engagement(id, kind)
            .await
            .map_err(error::from_civic)?;
        Ok(GqlIssue::from(issue))
    }

    /// Reporter feedback on a resolved issue.
    async fn submit_feedback(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        rating: i32,
        comment: Option<String>,
        helpful: Option<bool>,
    ) -> Result<GqlIssue> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let actor = context::require_actor(ctx)?;

        let rating = u8::try_from(rating)
            .map_err(|_| Error::new(format!("rating out of range: {rating}")))?;
        let issue = deps
            .engine
            .submit_feedback(&actor, id, rating, comment, helpful.unwrap_or(false))
            .await
            .map_err(error::from_civic)?;
        Ok(GqlIssue::from(issue))
    }
}
