//! Server Initialization
//!
//! Assembles the full application: database pool, collaborator clients,
//! the trip service, the router, and the background task that reaps
//! abandoned broadcast channels.

use crate::backend::directory::{HttpForecastProvider, HttpPlaceDirectory};
use crate::backend::profiles::PgProfileStore;
use crate::backend::realtime::TripBroadcast;
use crate::backend::routes::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::trip::{PgCheckInStore, PgTripStore, TripService};
use axum::Router;
use std::sync::Arc;

/// Create and configure the Axum application
///
/// # Errors
///
/// Fails when the database is unreachable; every other collaborator is
/// constructed lazily and degrades per its own contract.
pub async fn create_app(config: &ServerConfig) -> Result<Router<()>, Box<dyn std::error::Error>> {
    tracing::info!("[Server] Initializing trip synchronization engine");

    let pool = load_database().await?;

    let broadcast = TripBroadcast::new();
    let service = Arc::new(TripService::new(
        Arc::new(PgTripStore::new(pool.clone())),
        Arc::new(PgCheckInStore::new(pool.clone())),
        Arc::new(HttpPlaceDirectory::new(
            pool.clone(),
            config.place_api_url.clone(),
            config.place_api_key.clone(),
        )),
        Arc::new(HttpForecastProvider::new(
            config.forecast_api_url.clone(),
            config.forecast_api_key.clone(),
        )),
        Arc::new(PgProfileStore::new(pool)),
        broadcast.clone(),
        config.checkin_radius_km,
    ));

    let app_state = AppState {
        service,
        broadcast: broadcast.clone(),
        jwt_secret: config.jwt_secret.clone(),
    };

    let app = create_router(app_state);

    // reap channels whose subscribers have all disconnected
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            broadcast.cleanup_inactive_channels();
            tracing::debug!("[Server] Cleaned up inactive trip broadcast channels");
        }
    });

    tracing::info!("[Server] Router configured with periodic cleanup task");

    Ok(app)
}
