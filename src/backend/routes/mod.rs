//! Route Configuration Module
//!
//! Assembles the HTTP routes for the trip engine:
//!
//! - Trip command routes (`/trip/...`), JWT-protected
//! - SSE subscription (`/trip/subscribe/{trip_id}`)
//! - Health check (`/health`), public

/// Main router creation
pub mod router;

pub use router::create_router;
