//! Router Configuration
//!
//! Builds the Axum router for the trip engine. Every `/trip` route sits
//! behind the JWT auth middleware; the SSE subscription endpoint shares
//! the same protection so only authenticated clients can attach to a
//! trip's channel.

use crate::backend::middleware::auth_middleware;
use crate::backend::realtime::subscription::handle_trip_subscription;
use crate::backend::server::state::AppState;
use crate::backend::trip::handlers;
use axum::routing::{delete, get, post, put};
use axum::Router;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let trip_routes = Router::new()
        .route(
            "/trip",
            post(handlers::create_trip).delete(handlers::delete_trip),
        )
        .route("/trip/invitation", get(handlers::get_invitation))
        .route("/trip/verifyInvitation", get(handlers::verify_invitation))
        .route("/trip/member", delete(handlers::remove_member))
        .route(
            "/trip/date",
            post(handlers::set_availability).put(handlers::set_trip_date),
        )
        .route("/trip/information", get(handlers::get_information))
        .route(
            "/trip/place",
            post(handlers::toggle_place).delete(handlers::remove_place),
        )
        .route("/trip/plan/place", post(handlers::add_place_to_day))
        .route("/trip/plan/activity", post(handlers::add_activity))
        .route("/trip/plan/item", delete(handlers::remove_item))
        .route("/trip/plan/time", put(handlers::set_plan_time))
        .route("/trip/stage", put(handlers::set_stage))
        .route("/trip/finalize", post(handlers::finalize))
        .route("/trip/name", put(handlers::set_name))
        .route("/trip/note", put(handlers::set_note))
        .route("/trip/coverImg", put(handlers::set_cover_img))
        .route("/trip/checkIn", post(handlers::check_in))
        .route("/trip/subscribe/{trip_id}", get(handle_trip_subscription))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(trip_routes)
        .fallback(|| async { "404 Not Found" })
        .with_state(app_state)
}
