//! Collaborator-facing error type.
//!
//! Invoicing, payments and payroll modules surface these upward. The ledger
//! core's own error carries operator detail; converting into `AppError`
//! keeps only what an end user may see.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Fixed message shown for every integrity alarm.
pub const INTERNAL_CONSISTENCY_MESSAGE: &str = "internal consistency error";

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller-correctable input error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation is not allowed in the record's current state.
    #[error("Invalid state: {0}")]
    State(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal consistency failure; detail lives only in operator logs.
    #[error("internal consistency error")]
    Internal,

    /// Infrastructure failure; the operation was rolled back and may be retried.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    /// Returns the HTTP-style status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::State(_) => 409,
            Self::NotFound(_) => 404,
            Self::Internal => 500,
            Self::Unavailable(_) => 503,
        }
    }

    /// Returns the stable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::State(_) => "STATE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unavailable(_) => "TRANSIENT_ERROR",
        }
    }

    /// Returns true if the caller may retry the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
