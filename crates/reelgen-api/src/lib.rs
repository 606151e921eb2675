//! Axum HTTP API server.
//!
//! This crate provides:
//! - Submit endpoints for sync and async generations
//! - Generation listings with cursor pagination
//! - Asset claim and publish/unpublish
//! - Bearer token verification (JWKS)
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
