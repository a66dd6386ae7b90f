//! Per-trip Event Broadcasting
//!
//! Manages one `tokio::sync::broadcast` channel per trip so events fan
//! out only to that trip's subscribers. Channels are created lazily on
//! first use and reaped once they have no receivers left.

use crate::shared::{TripEvent, TripEventName};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Capacity of each per-trip channel
const CHANNEL_CAPACITY: usize = 256;

/// Broadcast state for trip channels
///
/// Cloneable handle; all clones share the same channel map.
#[derive(Clone, Default)]
pub struct TripBroadcast {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<TripEvent>>>>,
}

impl TripBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the broadcast sender for a trip
    pub fn sender(&self, trip_id: &str) -> broadcast::Sender<TripEvent> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(trip_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribe to a trip's channel
    pub fn subscribe(&self, trip_id: &str) -> broadcast::Receiver<TripEvent> {
        self.sender(trip_id).subscribe()
    }

    /// Fire-and-forget publish to every subscriber of a trip
    ///
    /// Returns the number of subscribers that received the event; a trip
    /// without subscribers is not an error.
    pub fn publish(&self, trip_id: &str, name: TripEventName, payload: serde_json::Value) -> usize {
        let event = TripEvent::new(name, payload);
        let sender = {
            let channels = self.channels.lock().unwrap();
            channels.get(trip_id).cloned()
        };
        match sender.map(|s| s.send(event)) {
            Some(Ok(count)) => {
                tracing::debug!(
                    "[Realtime] {} broadcast to {} subscribers of trip {}",
                    name.as_str(),
                    count,
                    trip_id
                );
                count
            }
            _ => {
                tracing::debug!(
                    "[Realtime] {} for trip {} had no subscribers",
                    name.as_str(),
                    trip_id
                );
                0
            }
        }
    }

    /// Drop a trip's channel entirely (trip deleted)
    pub fn remove_channel(&self, trip_id: &str) {
        self.channels.lock().unwrap().remove(trip_id);
    }

    /// Reap channels with no remaining subscribers
    pub fn cleanup_inactive_channels(&self) {
        self.channels
            .lock()
            .unwrap()
            .retain(|_, sender| sender.receiver_count() > 0);
    }

    /// Subscriber count for a trip's channel
    pub fn subscriber_count(&self, trip_id: &str) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(trip_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}
