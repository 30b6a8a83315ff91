//! # API Shared
//!
//! Shared definitions for the intake REST API.
//!
//! Contains:
//! - Request and response bodies (`wire` module), used by the server and the HTTP client
//! - Shared services like `HealthService`

pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
