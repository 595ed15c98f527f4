//! Liveness and dependency status.

use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use scripto_core::defaults;

use crate::AppState;

const OK: &str = "ok";
const UNAVAILABLE: &str = "unavailable";

/// Always `200`; `status` is `degraded` when a dependency check fails.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let provider = match state.provider.health_check().await {
        Ok(true) => OK,
        Ok(false) => UNAVAILABLE,
        Err(e) => {
            warn!(subsystem = "api", component = "health", error = %e, "Provider health check errored");
            UNAVAILABLE
        }
    };

    let database = match &state.database {
        None => "memory",
        Some(db) => {
            let deadline = Duration::from_secs(defaults::DB_HEALTH_TIMEOUT_SECS);
            match tokio::time::timeout(deadline, db.ping()).await {
                Ok(Ok(())) => OK,
                Ok(Err(e)) => {
                    warn!(subsystem = "api", component = "health", error = %e, "Database ping failed");
                    UNAVAILABLE
                }
                Err(_) => {
                    warn!(subsystem = "api", component = "health", "Database ping timed out");
                    UNAVAILABLE
                }
            }
        }
    };

    let status = if provider == OK && database != UNAVAILABLE {
        "healthy"
    } else {
        "degraded"
    };

    Json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "provider": provider,
            "database": database,
        },
    }))
}
