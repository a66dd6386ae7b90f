//! Real-time Subscription Handler
//!
//! Server-Sent Events endpoint for `GET /trip/subscribe/{trip_id}`.
//! Joining a channel is keyed purely by trip id; membership is already
//! enforced by the auth middleware plus the information endpoints, and
//! the stream only ever carries data the member endpoints expose.
//!
//! Lagged receivers skip ahead rather than dropping the connection;
//! axum's keep-alive comments hold the connection open between events.

use crate::backend::server::state::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream;
use tokio::sync::broadcast::error::RecvError;

/// Handle SSE subscription for one trip's event channel
pub async fn handle_trip_subscription(
    State(app_state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, axum::Error>>> {
    tracing::info!("[Realtime] Subscription request for trip {}", trip_id);

    let rx = app_state.broadcast.subscribe(&trip_id);

    let stream = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = match serde_json::to_string(&event) {
                        Ok(data) => data,
                        Err(e) => {
                            tracing::error!("[Realtime] Failed to serialize event: {:?}", e);
                            continue;
                        }
                    };
                    let sse_event = Event::default().event(event.name.as_str()).data(data);
                    return Some((Ok(sse_event), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("[Realtime] Receiver lagged, skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("[Realtime] Trip channel closed, ending stream");
                    return None;
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
