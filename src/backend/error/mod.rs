//! Backend Error Module
//!
//! This module defines the server-side error type and its HTTP mapping.
//! Handlers return [`ApiError`] directly; the conversion module turns it
//! into a JSON error response with the right status code.
//!
//! # Module Structure
//!
//! - **`types`** - Error type definitions and status-code mapping
//! - **`conversion`** - `IntoResponse` implementation

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::ApiError;
