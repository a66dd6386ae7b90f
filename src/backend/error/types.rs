//! Backend Error Types
//!
//! The server-side error type wraps the domain taxonomy from
//! `shared::error` and the infrastructure failures that can occur around
//! it (database, serialization). Each variant maps to a specific HTTP
//! status so handlers can return errors directly.

use crate::shared::TripError;
use axum::http::StatusCode;
use thiserror::Error;

/// All errors a request handler can produce
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error from a trip mutation or query
    #[error(transparent)]
    Trip(#[from] TripError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Trip(err) => match err {
                TripError::TripNotFound { .. }
                | TripError::InviteNotFound { .. }
                | TripError::PlaceNotFound { .. }
                | TripError::MemberNotFound { .. }
                | TripError::PlanItemNotFound { .. }
                | TripError::DayNotFound { .. } => StatusCode::NOT_FOUND,
                TripError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
                TripError::CapacityExceeded { .. }
                | TripError::DuplicateActivity { .. }
                | TripError::InvalidDateRange { .. }
                | TripError::OutOfRange { .. }
                | TripError::InvalidStageTransition { .. }
                | TripError::NotFinalized { .. } => StatusCode::BAD_REQUEST,
                TripError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            },
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message for the response body
    pub fn message(&self) -> String {
        match self {
            Self::Trip(err) => err.to_string(),
            Self::Database(err) => err.to_string(),
            Self::Serialization(err) => err.to_string(),
        }
    }
}
