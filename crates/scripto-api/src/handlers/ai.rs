//! AI interaction routes: submit, poll, history.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use scripto_core::{
    defaults, DefineTermRequest, Interaction, InteractionKind, InteractionStatus,
    SolveProblemRequest,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// What a caller sees of an interaction.
///
/// Failed interactions expose a sanitized message; the stored provider error
/// stays in the log.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct InteractionView {
    pub id: Uuid,
    pub kind: InteractionKind,
    pub status: InteractionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Interaction> for InteractionView {
    fn from(interaction: Interaction) -> Self {
        Self {
            id: interaction.id,
            kind: interaction.kind,
            status: interaction.status,
            response: interaction.response,
            error: interaction.error_message.as_deref().map(public_error),
            created_at: interaction.created_at,
            completed_at: interaction.completed_at,
        }
    }
}

/// Map a stored failure message to one safe to show the caller.
pub fn public_error(stored: &str) -> String {
    if stored.starts_with("Processing error:") || stored.starts_with("Invalid input:") {
        stored.to_string()
    } else if stored.starts_with("AI provider timeout") {
        "The AI provider did not respond in time, please resubmit".to_string()
    } else {
        "AI processing failed, please resubmit".to_string()
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn solve_problem(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<SolveProblemRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    req.validate()?;

    let receipt = state
        .orchestrator
        .submit(InteractionKind::StemSolution, req.into_payload(), user_id)
        .await?;

    info!(
        subsystem = "api",
        op = "solve_problem",
        interaction_id = %receipt.id,
        "Accepted STEM problem"
    );
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn define_term(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<DefineTermRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    req.validate()?;

    let receipt = state
        .orchestrator
        .submit(InteractionKind::TermDefinition, req.into_payload(), user_id)
        .await?;

    info!(
        subsystem = "api",
        op = "define_term",
        interaction_id = %receipt.id,
        "Accepted term definition"
    );
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn get_interaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<InteractionView>, ApiError> {
    let Path(id) = path?;
    let interaction = state.orchestrator.get_status(id, user_id).await?;
    Ok(Json(interaction.into()))
}

pub async fn list_interactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<InteractionView>>, ApiError> {
    let Query(query) = query?;
    let interactions = state
        .orchestrator
        .list_for_user(
            user_id,
            query.limit.unwrap_or(defaults::PAGE_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(interactions.into_iter().map(Into::into).collect()))
}
