//! Per-request identity, resolved upstream and passed through headers.

use async_graphql::{Context, Result};
use axum::http::HeaderMap;
use uuid::Uuid;

use civicsignal_common::{Actor, Role};

use crate::graphql::error;

/// The authenticated caller, if any. Anonymous requests can still read
/// public data.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthContext {
    pub actor: Option<Actor>,
}

impl AuthContext {
    /// `x-user-id` identifies the caller; `x-user-role` defaults to citizen.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        let actor = user_id.map(|user_id| {
            let role = headers
                .get("x-user-role")
                .and_then(|v| v.to_str().ok())
                .map(Role::from_str_loose)
                .unwrap_or(Role::Citizen);
            Actor::new(user_id, role)
        });

        Self { actor }
    }
}

/// The caller's actor, or an unauthenticated error.
pub fn require_actor(ctx: &Context<'_>) -> Result<Actor> {
    ctx.data_unchecked::<AuthContext>()
        .actor
        .ok_or_else(error::unauthenticated)
}

pub fn maybe_actor(ctx: &Context<'_>) -> Option<Actor> {
    ctx.data_unchecked::<AuthContext>().actor
}
