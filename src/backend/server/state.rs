//! Application State Management
//!
//! `AppState` is the central state container shared across all request
//! handlers: the trip command service, the per-trip broadcast channels
//! and the JWT secret the auth middleware verifies against. `FromRef`
//! implementations let handlers extract just the part they need.

use crate::backend::realtime::TripBroadcast;
use crate::backend::trip::TripService;
use axum::extract::FromRef;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The trip command service; all mutations and queries go through it
    pub service: Arc<TripService>,

    /// Per-trip broadcast channels for SSE subscriptions
    ///
    /// The same handle the service publishes on, so subscribers see
    /// every event the command side emits.
    pub broadcast: TripBroadcast,

    /// Secret the auth middleware verifies bearer tokens against
    pub jwt_secret: String,
}

impl FromRef<AppState> for Arc<TripService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.service.clone()
    }
}

impl FromRef<AppState> for TripBroadcast {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.broadcast.clone()
    }
}
