//! # scripto-api
//!
//! HTTP adapter for the ScriptO AI pipeline.
//!
//! Routes:
//! - `POST /api/v1/ai/solve` and `POST /api/v1/ai/define` accept work and
//!   return `202 {id, status}`
//! - `GET /api/v1/ai/interactions/:id` polls one interaction
//! - `GET /api/v1/ai/interactions` lists the caller's history
//! - `GET /health`

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use governor::RateLimiter;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use scripto_core::{defaults, AiProvider};
use scripto_db::Database;
use scripto_jobs::InteractionOrchestrator;

pub use auth::AuthUser;
pub use config::ServerConfig;
pub use error::ApiError;

/// Per-user rate limiter for the AI routes, keyed by `X-User-Id`.
pub type UserRateLimiter = RateLimiter<
    Uuid,
    governor::state::keyed::DefaultKeyedStateStore<Uuid>,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<InteractionOrchestrator>,
    /// Provider checked by `/health`.
    pub provider: Arc<dyn AiProvider>,
    /// `None` when interactions are kept in memory.
    pub database: Option<Database>,
    /// `None` when rate limiting is disabled.
    pub rate_limiter: Option<Arc<UserRateLimiter>>,
}

/// Generates time-ordered UUIDv7 request correlation ids.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Unidentified callers are rejected by the extractor before any quota is
/// spent.
async fn rate_limit_middleware(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check_key(&user_id).is_err() {
            tracing::warn!(
                subsystem = "api",
                component = "rate_limit",
                %user_id,
                "Rate limit exceeded"
            );
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many AI requests, please wait before retrying"
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

/// Build the router with middleware.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    use handlers::ai;

    let ai_routes = Router::new()
        .route("/solve", post(ai::solve_problem))
        .route("/define", post(ai::define_term))
        .route("/interactions", get(ai::list_interactions))
        .route("/interactions/:id", get(ai::get_interaction))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1/ai", ai_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_origins()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static(auth::USER_ID_HEADER),
                ])
                .max_age(Duration::from_secs(defaults::CORS_MAX_AGE_SECS)),
        )
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_SIZE_BYTES))
        .with_state(state)
}
