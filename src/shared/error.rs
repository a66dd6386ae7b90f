//! Shared Error Types
//!
//! This module defines the domain error taxonomy for the trip
//! synchronization engine. The same errors are produced by the pure
//! aggregate mutations and surfaced through the HTTP layer, so every
//! variant carries enough context to render a specific message (which
//! trip, which place, which member) rather than a generic failure.
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across
//! thread boundaries.
use thiserror::Error;

/// Domain errors for trip commands
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TripError {
    /// Referenced trip does not exist
    #[error("No trip found for tripId: {trip_id}")]
    TripNotFound {
        /// The trip identifier that failed to resolve
        trip_id: String,
    },

    /// Referenced invite token does not exist
    #[error("No trip found for inviteLink: {invite_link}")]
    InviteNotFound {
        /// The invite token that failed to resolve
        invite_link: String,
    },

    /// Referenced place could not be resolved or is not nominated
    #[error("No place found for placeId: {place_id}")]
    PlaceNotFound {
        /// The place identifier that failed to resolve
        place_id: String,
    },

    /// Targeted user is not a member of the trip
    #[error("No member {user_id} found for tripId: {trip_id}")]
    MemberNotFound { trip_id: String, user_id: String },

    /// Referenced plan item (place or activity) does not exist
    #[error("No plan item found for itemId: {item_id}")]
    PlanItemNotFound {
        /// The plan place or activity identifier
        item_id: String,
    },

    /// Referenced day bucket does not exist in the plan
    #[error("No plan day {day} for tripId: {trip_id}")]
    DayNotFound { trip_id: String, day: u32 },

    /// Requester is not allowed to perform this operation
    #[error("Permission denied for user {user_id} on trip {trip_id}")]
    PermissionDenied { trip_id: String, user_id: String },

    /// Member count would exceed the fixed cap
    #[error("The trip is already at maximum capacity ({capacity} members).")]
    CapacityExceeded {
        /// The configured member cap
        capacity: usize,
    },

    /// Activity name collision within a single day bucket
    #[error("Duplicate activity '{name}' on day {day}")]
    DuplicateActivity { day: u32, name: String },

    /// Trip date window missing or inverted
    #[error("Invalid date range for trip {trip_id}: {message}")]
    InvalidDateRange { trip_id: String, message: String },

    /// Check-in attempted too far from the place's coordinates
    #[error("Check-in rejected: {distance_km:.2} km from place, threshold {threshold_km} km")]
    OutOfRange {
        /// Measured great-circle distance in kilometers
        distance_km: f64,
        /// Configured check-in radius in kilometers
        threshold_km: f64,
    },

    /// A required external collaborator failed
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Human-readable description of the failed collaborator call
        message: String,
    },

    /// Trip has not been finalized yet; check-in progression requires it
    #[error("Trip {trip_id} has no finalized itinerary")]
    NotFinalized { trip_id: String },

    /// Stage change rejected by the stage machine
    #[error("Cannot move trip from stage '{from}' to stage '{to}'")]
    InvalidStageTransition { from: String, to: String },
}

impl TripError {
    /// Create an upstream-unavailable error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// Create a permission-denied error
    pub fn denied(trip_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::PermissionDenied {
            trip_id: trip_id.into(),
            user_id: user_id.into(),
        }
    }
}
