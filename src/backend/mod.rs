//! Backend Module
//!
//! Server-side code for the trip synchronization engine:
//!
//! - **`trip`** - the Trip aggregate's persistence, command service and
//!   HTTP handlers
//! - **`directory`** - external place directory and forecast clients
//! - **`realtime`** - per-trip broadcast channels and SSE subscriptions
//! - **`profiles`** - read-only user profile projections
//! - **`middleware`** - JWT authentication
//! - **`error`** - HTTP error mapping
//! - **`routes`** / **`server`** - router assembly and startup

/// Trip aggregate service, persistence and handlers
pub mod trip;

/// External collaborator clients (place directory, forecast)
pub mod directory;

/// Per-trip event broadcasting and SSE subscriptions
pub mod realtime;

/// User profile projections
pub mod profiles;

/// HTTP middleware (authentication)
pub mod middleware;

/// Backend error types and HTTP mapping
pub mod error;

/// Route configuration
pub mod routes;

/// Server initialization and state
pub mod server;
