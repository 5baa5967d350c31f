//! HTTP handlers: liveness and readiness checks.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::warn;

use crate::db::DbPool;
use crate::repositories::RedisQueue;

/// Shared state for the health endpoints.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub queue: RedisQueue,
}

impl AppState {
    pub fn db(&self) -> &DbPool {
        &self.db
    }
    pub fn queue(&self) -> &RedisQueue {
        &self.queue
    }
}

/// GET /health — liveness check.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "auth-service" })),
    )
}

/// GET /ready — Postgres and Redis reachable.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = match sqlx::query("SELECT 1").execute(state.db()).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "readiness: database unreachable");
            false
        }
    };
    let redis_ok = match state.queue().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "readiness: redis unreachable");
            false
        }
    };

    let status = if db_ok && redis_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ready" } else { "unavailable" },
            "database": db_ok,
            "redis": redis_ok
        })),
    )
}
