pub mod context;
pub mod error;
pub mod issues;
pub mod notifications;

use std::sync::Arc;

use async_graphql::*;

use crate::ApiDeps;

/// Merged query root composing all domain query modules.
#[derive(MergedObject, Default)]
pub struct QueryRoot(issues::IssueQuery, notifications::NotificationQuery);

/// Merged mutation root composing all domain mutation modules.
#[derive(MergedObject, Default)]
pub struct MutationRoot(
    issues::mutations::IssueMutation,
    notifications::mutations::NotificationMutation,
);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(deps: Arc<ApiDeps>) -> AppSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(deps)
        .limit_depth(10)
        .limit_complexity(1000)
        .finish()
}
