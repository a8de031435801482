//! # Guacamole relay
//!
//! Logs into Apache Guacamole with one service account, keeps the session
//! token cached until it expires or is rejected, and serves a few read-only
//! queries (users, connections) reshaped for a browser frontend.
//!
//! Modules:
//! - `config` — environment / CLI settings
//! - `cache` — session credential and its lazy-refresh cache
//! - `sources` — Guacamole client, authenticated fetcher, payload shaping
//! - `server` — axum routes

pub mod config;
pub mod cache;
pub mod errors;
pub mod sources;
pub mod resilience;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;

#[cfg(test)]
mod tests;


pub use crate::errors::{AuthError, FetchError};
pub use crate::sources::fetch::AuthenticatedFetcher;
