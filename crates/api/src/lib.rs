//! Genesis API server library.
//!
//! Exposes configuration, state, error handling, middleware and routes so
//! integration tests and the binary entrypoint share the same pieces.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
