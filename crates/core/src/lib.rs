//! Core domain types and shared configuration for Tally.
//!
//! This crate defines what every other crate agrees on:
//! - Application, server and metadata store configuration
//! - Column limits for the counter and visit-log tables
//! - Validation of visit-log input

pub mod config;
pub mod error;
pub mod visit;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use visit::NewPageVisit;

/// Name of the counter row the service operates on unless configured otherwise.
pub const DEFAULT_COUNTER_NAME: &str = "main";

/// Maximum length of a counter name.
pub const MAX_COUNTER_NAME_LEN: usize = 100;

/// Maximum length of a visited page path.
pub const MAX_PAGE_LEN: usize = 255;

/// Maximum length of a visitor address (long enough for IPv6 text form).
pub const MAX_VISITOR_IP_LEN: usize = 45;

/// Maximum length of a stored user agent.
pub const MAX_USER_AGENT_LEN: usize = 500;
