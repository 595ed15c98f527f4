//! In-memory interaction repository.
//!
//! Same conditional-transition semantics as the PostgreSQL repository.
//! Used by tests and by deployments that do not need durable history.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use uuid::Uuid;

use scripto_core::{
    new_v7, Interaction, InteractionRepository, InteractionStatus, NewInteraction, Result,
};

#[derive(Default)]
pub struct InMemoryInteractionRepository {
    records: RwLock<HashMap<Uuid, Interaction>>,
}

impl InMemoryInteractionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored interactions.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Move the record to `to` and apply `update` if the state machine allows it.
    async fn transition(
        &self,
        id: Uuid,
        to: InteractionStatus,
        update: impl FnOnce(&mut Interaction),
    ) -> bool {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) if record.status.can_transition_to(to) => {
                record.status = to;
                update(record);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn insert(&self, new: NewInteraction) -> Result<Interaction> {
        let interaction = Interaction::pending(new_v7(), new);
        self.records
            .write()
            .await
            .insert(interaction.id, interaction.clone());
        Ok(interaction)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Interaction>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Interaction>> {
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .filter(|i| i.user_id == user_id)
            .cloned())
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool> {
        Ok(self
            .transition(id, InteractionStatus::Processing, |i| {
                i.started_at = Some(Utc::now());
            })
            .await)
    }

    async fn complete(&self, id: Uuid, response: JsonValue) -> Result<bool> {
        Ok(self
            .transition(id, InteractionStatus::Completed, |i| {
                i.response = Some(response);
                i.completed_at = Some(Utc::now());
            })
            .await)
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<bool> {
        Ok(self
            .transition(id, InteractionStatus::Failed, |i| {
                i.error_message = Some(error.to_string());
                i.completed_at = Some(Utc::now());
            })
            .await)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Interaction>> {
        let records = self.records.read().await;
        let mut owned: Vec<Interaction> = records
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn ids_with_status(&self, status: InteractionStatus, limit: i64) -> Result<Vec<Uuid>> {
        let records = self.records.read().await;
        let mut matching: Vec<&Interaction> =
            records.values().filter(|i| i.status == status).collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matching
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|i| i.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripto_core::InteractionKind;
    use serde_json::json;

    fn new_interaction(user_id: Uuid) -> NewInteraction {
        NewInteraction {
            user_id,
            kind: InteractionKind::StemSolution,
            request: json!({"text": "2 + 2", "subject": "algebra", "context": null}),
        }
    }

    #[tokio::test]
    async fn test_insert_is_pending_and_round_trips_request() {
        let repo = InMemoryInteractionRepository::new();
        let user = Uuid::new_v4();
        let created = repo.insert(new_interaction(user)).await.unwrap();

        assert_eq!(created.status, InteractionStatus::Pending);
        assert_eq!(created.id.get_version_num(), 7);

        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.request, new_interaction(user).request);
        assert!(fetched.is_consistent());
    }

    #[tokio::test]
    async fn test_get_for_user_checks_owner() {
        let repo = InMemoryInteractionRepository::new();
        let owner = Uuid::new_v4();
        let created = repo.insert(new_interaction(owner)).await.unwrap();

        assert!(repo.get_for_user(created.id, owner).await.unwrap().is_some());
        assert!(repo
            .get_for_user(created.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_transitions_are_conditional() {
        let repo = InMemoryInteractionRepository::new();
        let created = repo.insert(new_interaction(Uuid::new_v4())).await.unwrap();

        // cannot finish before processing
        assert!(!repo.complete(created.id, json!({})).await.unwrap());
        assert!(!repo.fail(created.id, "x").await.unwrap());

        assert!(repo.mark_processing(created.id).await.unwrap());
        assert!(!repo.mark_processing(created.id).await.unwrap());

        assert!(repo.complete(created.id, json!({"solution": "4"})).await.unwrap());
        assert!(!repo.fail(created.id, "late").await.unwrap());

        let done = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(done.status, InteractionStatus::Completed);
        assert!(done.started_at.is_some());
        assert!(done.completed_at.is_some());
        assert!(done.error_message.is_none());
        assert!(done.is_consistent());
    }

    #[tokio::test]
    async fn test_fail_sets_error_and_timestamp() {
        let repo = InMemoryInteractionRepository::new();
        let created = repo.insert(new_interaction(Uuid::new_v4())).await.unwrap();
        repo.mark_processing(created.id).await.unwrap();
        assert!(repo.fail(created.id, "provider down").await.unwrap());

        let failed = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(failed.status, InteractionStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("provider down"));
        assert!(failed.response.is_none());
        assert!(failed.is_consistent());
    }

    #[tokio::test]
    async fn test_unknown_id_transitions_return_false() {
        let repo = InMemoryInteractionRepository::new();
        assert!(!repo.mark_processing(Uuid::new_v4()).await.unwrap());
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first_with_paging() {
        let repo = InMemoryInteractionRepository::new();
        let user = Uuid::new_v4();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(repo.insert(new_interaction(user)).await.unwrap().id);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        repo.insert(new_interaction(Uuid::new_v4())).await.unwrap();
        assert_eq!(repo.len().await, 4);

        let all = repo.list_for_user(user, 10, 0).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, ids[2]);
        assert_eq!(all[2].id, ids[0]);

        let page = repo.list_for_user(user, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, ids[1]);
    }

    #[tokio::test]
    async fn test_ids_with_status_oldest_first() {
        let repo = InMemoryInteractionRepository::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(repo.insert(new_interaction(Uuid::new_v4())).await.unwrap().id);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        repo.mark_processing(ids[1]).await.unwrap();

        let pending = repo
            .ids_with_status(InteractionStatus::Pending, 10)
            .await
            .unwrap();
        assert_eq!(pending, vec![ids[0], ids[2]]);

        let limited = repo
            .ids_with_status(InteractionStatus::Pending, 1)
            .await
            .unwrap();
        assert_eq!(limited, vec![ids[0]]);

        let processing = repo
            .ids_with_status(InteractionStatus::Processing, 10)
            .await
            .unwrap();
        assert_eq!(processing, vec![ids[1]]);
        assert!(repo
            .ids_with_status(InteractionStatus::Failed, 10)
            .await
            .unwrap()
            .is_empty());
    }
}
