//! Trip Module
//!
//! The collaborative trip engine: persistence for the Trip aggregate,
//! the command service orchestrating mutations and broadcasts, and the
//! HTTP handlers exposing the command surface.

/// Trip aggregate persistence (JSONB document + optimistic versioning)
pub mod store;

/// Command orchestration: load, mutate, persist, broadcast
pub mod service;

/// HTTP handlers for the trip command surface
pub mod handlers;

pub use service::{CheckInOutcome, MemberProjection, TripService};
pub use store::{CheckInStore, PgCheckInStore, PgTripStore, TripStore};
