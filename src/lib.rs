//! Scraper Session Library
//!
//! This library acquires an authenticated session against a remote service
//! that still uses a legacy form-based login. A downstream scraper hands in
//! an HTTP client with a cookie jar; after a successful login the jar holds
//! the session cookie and every later request through that client is
//! authenticated.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`context`] - Cancellation and deadline propagation
//! - [`transport`] - HTTP client seam with the `reqwest` implementation
//! - [`auth`] - Single login attempt and the bounded retry loop
//! - [`metrics`] - Duration histograms recorded through the `metrics` facade
//! - [`db`] - Database connection and schema management
//! - [`status`] - Last processed date marker used by the scraper

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod context;
pub mod db;
pub mod metrics;
pub mod status;
pub mod transport;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use auth::{
    Credentials, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, LoginError, LoginErrorKind,
    LoginFailed, LoginOutcome, RequestBuildError, RetryPolicy, SessionTarget, login, retry_login,
    retry_login_with_policy,
};
pub use context::{Context, ContextError, error_chain_contains};
pub use db::{Database, DbError};
pub use status::{StatusError, StatusRepository};
pub use transport::{BoxError, HttpClient, Transport, TransportResponse};
pub use user_agent::LOGIN_USER_AGENT;
