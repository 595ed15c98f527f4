//! Core traits for ScriptO abstractions.
//!
//! Storage and AI access sit behind these traits so the orchestrator can be
//! driven by PostgreSQL and Anthropic in production and by in-memory fakes
//! in tests.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// INTERACTION REPOSITORY
// =============================================================================

/// Persistence for interaction records.
///
/// All transition methods are conditional on the current status and return
/// `false` when the row was not in the expected state. Callers decide whether
/// that is an error.
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Persist a new interaction in `pending` status.
    async fn insert(&self, new: NewInteraction) -> Result<Interaction>;

    /// Fetch an interaction regardless of owner.
    async fn get(&self, id: Uuid) -> Result<Option<Interaction>>;

    /// Fetch an interaction only if it belongs to `user_id`.
    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Interaction>>;

    /// `pending -> processing`, stamping `started_at`.
    async fn mark_processing(&self, id: Uuid) -> Result<bool>;

    /// `processing -> completed`, storing the response payload.
    async fn complete(&self, id: Uuid, response: JsonValue) -> Result<bool>;

    /// `processing -> failed`, storing the error message.
    async fn fail(&self, id: Uuid, error: &str) -> Result<bool>;

    /// A user's interactions, newest first.
    async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64)
        -> Result<Vec<Interaction>>;

    /// Ids of interactions currently in `status`, oldest first, at most `limit`.
    async fn ids_with_status(&self, status: InteractionStatus, limit: i64) -> Result<Vec<Uuid>>;
}

// =============================================================================
// AI PROVIDER
// =============================================================================

/// Language-model provider used for classification, solving and defining.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Raw completion for an arbitrary prompt.
    async fn generate_completion(&self, prompt: &str, params: CompletionParams) -> Result<String>;

    /// Step-by-step markdown solution of a STEM problem.
    async fn solve_stem_problem(&self, problem: &str, subject: &str) -> Result<StemSolution>;

    /// Grade-appropriate markdown definition of a term.
    async fn define_term(&self, term: &str, context: &DefinitionContext)
        -> Result<TermDefinition>;

    /// Model used when the caller does not pick one.
    fn model_name(&self) -> &str;

    /// Check if the provider is reachable.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
