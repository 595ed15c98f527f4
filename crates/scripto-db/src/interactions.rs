//! Interaction repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use scripto_core::{
    new_v7, Error, Interaction, InteractionRepository, InteractionStatus, NewInteraction,
    Result,
};

const COLUMNS: &str = "id, user_id, kind::text AS kind, status::text AS status, request, response, \
     error_message, created_at, started_at, completed_at";

/// PostgreSQL implementation of InteractionRepository.
#[derive(Clone)]
pub struct PgInteractionRepository {
    pool: Pool<Postgres>,
}

impl PgInteractionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> Result<Interaction> {
        let kind: String = row.get("kind");
        let status: String = row.get("status");
        Ok(Interaction {
            id: row.get("id"),
            user_id: row.get("user_id"),
            kind: kind.parse()?,
            status: status.parse()?,
            request: row.get("request"),
            response: row.get("response"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait]
impl InteractionRepository for PgInteractionRepository {
    async fn insert(&self, new: NewInteraction) -> Result<Interaction> {
        let interaction = Interaction::pending(new_v7(), new);

        sqlx::query(
            "INSERT INTO ai_interactions (id, user_id, kind, status, request, created_at)
             VALUES ($1, $2, $3::interaction_kind, 'pending'::interaction_status, $4, $5)",
        )
        .bind(interaction.id)
        .bind(interaction.user_id)
        .bind(interaction.kind.as_str())
        .bind(&interaction.request)
        .bind(interaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "interactions",
            op = "insert",
            interaction_id = %interaction.id,
            kind = %interaction.kind,
            "Interaction created"
        );
        Ok(interaction)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Interaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ai_interactions WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_row).transpose()
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Interaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ai_interactions WHERE id = $1 AND user_id = $2",
            COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_row).transpose()
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE ai_interactions
             SET status = 'processing'::interaction_status, started_at = $1
             WHERE id = $2 AND status = 'pending'::interaction_status",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete(&self, id: Uuid, response: JsonValue) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE ai_interactions
             SET status = 'completed'::interaction_status, response = $1, completed_at = $2
             WHERE id = $3 AND status = 'processing'::interaction_status",
        )
        .bind(&response)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE ai_interactions
             SET status = 'failed'::interaction_status, error_message = $1, completed_at = $2
             WHERE id = $3 AND status = 'processing'::interaction_status",
        )
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ai_interactions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
            COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_row).collect()
    }

    async fn ids_with_status(&self, status: InteractionStatus, limit: i64) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT id FROM ai_interactions
             WHERE status = $1::interaction_status
             ORDER BY created_at, id
             LIMIT $2",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }
}
