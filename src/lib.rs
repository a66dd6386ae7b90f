//! Tripstream - Collaborative Trip Synchronization Engine
//!
//! Tripstream is the backend for a social travel planner: small groups
//! (up to four members) collaboratively nominate places, build a
//! day-by-day itinerary, walk it with location-verified check-ins and
//! see every change live over Server-Sent Events.
//!
//! # Module Structure
//!
//! - **`shared`** - Pure domain types: the `Trip` aggregate and its
//!   mutations, the realtime event contract, errors and geodesic helpers
//! - **`backend`** - Axum HTTP server: persistence, command service,
//!   external collaborator clients, broadcasting, auth and routing
//!
//! # Consistency Model
//!
//! Every mutation is load → apply → compare-and-swap persist → broadcast.
//! The optimistic version check means concurrent members never silently
//! clobber each other, and events are only published after the state
//! they describe is durable.

/// Shared domain types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;
