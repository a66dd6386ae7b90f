//! Middleware Module
//!
//! HTTP middleware for the backend server. Currently provides the
//! authentication layer every trip route sits behind.

pub mod auth;

pub use auth::{auth_middleware, AuthUser, AuthenticatedUser};
