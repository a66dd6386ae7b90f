//! Server Module
//!
//! Initialization and configuration of the Axum HTTP server:
//!
//! - **`state`** - `AppState` and `FromRef` implementations
//! - **`config`** - environment configuration and database setup
//! - **`init`** - application assembly

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::ServerConfig;
pub use init::create_app;
pub use state::AppState;
