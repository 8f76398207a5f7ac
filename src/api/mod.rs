//! HTTP API for the notice dashboard.
//!
//! Async axum handlers over the blocking pipeline and store; every
//! handler bridges with `spawn_blocking`. Errors leave as
//! `{"error": {"code", "message"}}` bodies.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod upload;

pub use router::notice_api_router;
