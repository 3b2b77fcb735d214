//! MemCard API server library.
//!
//! Exposes the server building blocks (config, state, session resolution,
//! request context, error handling, routes) so integration tests and the
//! binary entrypoint share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
