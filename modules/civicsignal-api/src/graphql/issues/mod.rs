pub mod mutations;
pub mod types;

use std::sync::Arc;

use async_graphql::*;
use uuid::Uuid;

use civicsignal_common::{Category, GeoPoint, IssueStatus, Priority};
use civicsignal_core::issue::EngagementKind;
use civicsignal_core::lifecycle::LifecycleEngine;
use civicsignal_core::pagination::{Connection as CoreConnection, PageRequest};
use civicsignal_core::store::{IssueFilter, IssueSort};

use crate::graphql::context;
use crate::graphql::error;
use crate::ApiDeps;
use types::{GqlIssue, GqlIssueConnection, GqlIssueStats};

const NEARBY_DEFAULT_RADIUS_KM: f64 = 5.0;
const NEARBY_MAX_RADIUS_KM: f64 = 50.0;

fn parse_sort(sort: Option<String>) -> Result<IssueSort> {
    match sort.as_deref() {
        None | Some("newest") => Ok(IssueSort::Newest),
        Some("oldest") => Ok(IssueSort::Oldest),
        Some("priority") => Ok(IssueSort::HighestPriority),
        Some("engagement") => Ok(IssueSort::MostEngaged),
        Some(other) => Err(Error::new(format!("unknown sort: {other}"))),
    }
}

#[derive(Default)]
pub struct IssueQuery;

#[Object]
impl IssueQuery {
    /// Fetch a single issue by id. Counts as a view.
    async fn issue(&self, ctx: &Context<'_>, id: Uuid) -> Result<GqlIssue> {
        tracing::info!(id = %id, "graphql.issue");
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let viewer = context::maybe_actor(ctx);

        let issue = deps
            .engine
            .get_issue(id, viewer.as_ref())
            .await
            .map_err(error::from_civic)?;
        let issue = deps
            .engine
            .record_engagement(id, EngagementKind::Views)
            .await
            .unwrap_or(issue);
        Ok(GqlIssue::from(issue))
    }

    /// Paginated issue connection with optional filters.
    #[graphql(complexity = "first.unwrap_or(20) as usize * child_complexity + 1")]
    async fn issues(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        first: Option<i32>,
        status: Option<String>,
        category: Option<String>,
        priority: Option<String>,
        search: Option<String>,
        urgent_only: Option<bool>,
        #[graphql(desc = "Restrict to the caller's own reports.")] mine: Option<bool>,
        #[graphql(desc = "newest (default), oldest, priority or engagement.")] sort: Option<
            String,
        >,
    ) -> Result<GqlIssueConnection> {
        tracing::info!(first = ?first, status = ?status, "graphql.issues");
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let viewer = context::maybe_actor(ctx);

        let mut filter = IssueFilter {
            status: status.as_deref().map(IssueStatus::parse).transpose().map_err(error::from_civic)?,
            category: category.as_deref().map(Category::parse).transpose().map_err(error::from_civic)?,
            priority: priority.as_deref().map(Priority::parse).transpose().map_err(error::from_civic)?,
            search,
            is_urgent: urgent_only.filter(|&urgent| urgent),
            visibility: LifecycleEngine::visibility_for(viewer.as_ref()),
            ..Default::default()
        };
        if mine.unwrap_or(false) {
            let actor = context::require_actor(ctx)?;
            filter.reporter = Some(actor.user_id);
        }
        let sort = parse_sort(sort)?;

        let request = PageRequest::from_args(first, after.as_deref()).map_err(error::from_civic)?;
        let window = deps
            .engine
            .list_issues(&filter, sort, request.offset, request.fetch_limit())
            .await
            .map_err(error::from_civic)?;
        let total = deps.engine.count_issues(&filter).await.map_err(error::from_civic)?;

        Ok(GqlIssueConnection::from(CoreConnection::from_window(window, request, total)))
    }

    /// Public issues within `radiusKm` of a point, nearest first.
    async fn nearby_issues(
        &self,
        ctx: &Context<'_>,
        longitude: f64,
        latitude: f64,
        radius_km: Option<f64>,
        first: Option<i32>,
    ) -> Result<Vec<GqlIssue>> {
        tracing::info!(longitude, latitude, radius_km = ?radius_km, "graphql.nearby_issues");
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();

        let point = GeoPoint::new(longitude, latitude).map_err(error::from_civic)?;
        let radius = radius_km.unwrap_or(NEARBY_DEFAULT_RADIUS_KM).min(NEARBY_MAX_RADIUS_KM);
        let limit = first.unwrap_or(20).clamp(1, 100) as usize;

        let issues = deps
            .engine
            .nearby_issues(point, radius, limit)
            .await
            .map_err(error::from_civic)?;
        Ok(issues.into_iter().map(GqlIssue::from).collect())
    }

    /// Highest-engagement public issues from the trailing week.
    async fn trending_issues(&self, ctx: &Context<'_>, first: Option<i32>) -> Result<Vec<GqlIssue>> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let limit = first.unwrap_or(10).clamp(1, 100) as usize;
        let issues = deps.engine.trending_issues(limit).await.map_err(error::from_civic)?;
        Ok(issues.into_iter().map(GqlIssue::from).collect())
    }

    /// Aggregate counts, resolution rate and trending categories.
    async fn issue_stats(&self, ctx: &Context<'_>) -> Result<GqlIssueStats> {
        let deps = ctx.data_unchecked::<Arc<ApiDeps>>();
        let stats = deps.engine.stats().await.map_err(error::from_civic)?;
        Ok(GqlIssueStats::from(stats))
    }
}
