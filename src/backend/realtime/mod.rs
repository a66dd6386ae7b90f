//! Real-time Module
//!
//! Per-trip publish/subscribe built on `tokio::sync::broadcast`. Every
//! trip gets its own channel so subscribers only see their trip's
//! events; publishing is fire-and-forget and never blocks command
//! processing on slow subscribers.
//!
//! The notifier is injected into the trip service as an explicit
//! dependency, which keeps the persist-then-notify ordering enforceable
//! and lets tests subscribe a capturing receiver.

/// Per-trip broadcast channels
pub mod broadcast;

/// SSE subscription handler
pub mod subscription;

pub use broadcast::TripBroadcast;
