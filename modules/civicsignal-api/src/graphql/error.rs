//! Mapping from engine errors to GraphQL errors with machine-readable codes.

use async_graphql::{Error, ErrorExtensions};

use civicsignal_common::CivicError;

pub fn from_civic(err: CivicError) -> Error {
    let code = match &err {
        CivicError::NotFound(_) => "NOT_FOUND",
        CivicError::Forbidden(_) => "FORBIDDEN",
        CivicError::Validation(_) => "BAD_REQUEST",
        CivicError::SchedulingConflict => "CONFLICT",
        CivicError::Delivery(_) => "DELIVERY_FAILED",
        CivicError::Database(_) | CivicError::Config(_) | CivicError::Anyhow(_) => "INTERNAL",
    };
    // Internal details stay in the logs, not the response.
    if code == "INTERNAL" {
        tracing::error!(error = %err, "internal error");
        Error::new("internal error").extend_with(|_, e| e.set("code", code))
    } else {
        Error::new(err.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

pub fn unauthenticated() -> Error {
    Error::new("authentication required").extend_with(|_, e| e.set("code", "UNAUTHENTICATED"))
}
