use thiserror::Error;

#[derive(Error, Debug)]
pub enum CivicError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Scheduling conflict: job already claimed for dispatch")]
    SchedulingConflict,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CivicError {
    /// True for caller errors that must leave all state untouched.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CivicError::NotFound(_) | CivicError::Forbidden(_) | CivicError::Validation(_)
        )
    }
}
