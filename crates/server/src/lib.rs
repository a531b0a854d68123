//! HTTP API server for Tally.
//!
//! This crate provides the HTTP surface over a single named counter:
//! - Counter read, increment and reset
//! - Health probe reporting database connectivity
//! - Root HTML page and optional static files
//! - Prometheus metrics

pub mod counter;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use counter::CounterService;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
