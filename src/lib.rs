//! Authentication microservice built with Rust.
//!
//! Registers accounts, authenticates credentials and validates bearer
//! tokens for other services. Requests arrive on a Redis list and replies
//! go back on a per-request list; accounts live in PostgreSQL.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;

pub use auth::{AccountAuthenticator, CredentialHasher, SignupCommand, TokenService};
pub use config::Config;
pub use error::AppError;
pub use handlers::http::AppState;
pub use repositories::RedisQueue;
pub use services::QueueConsumer;

use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Build the health router (health, ready). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
