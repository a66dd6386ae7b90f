//! Shared Module
//!
//! This module contains the domain types and data structures shared
//! between the server and its clients. Everything here is pure and
//! serialization-friendly: the `Trip` aggregate and its mutations, the
//! realtime event contract, the error taxonomy and geodesic helpers.

/// Trip aggregate and pure domain mutations
pub mod trip;

/// Real-time event system
pub mod event;

/// Shared error types
pub mod error;

/// Geodesic helpers for check-in validation
pub mod geo;

/// Re-export commonly used types for convenience
pub use error::TripError;
pub use event::{TripEvent, TripEventName};
pub use trip::{
    CoverImg, DateWindow, DayBucket, JoinOutcome, PlaceVote, PlanActivity, PlanItemKind,
    PlanPlace, Progression, RemovedPlanItem, TimeField, ToggleOutcome, Trip, TripMember,
    TripQuery, TripStage, MAX_MEMBERS,
};
