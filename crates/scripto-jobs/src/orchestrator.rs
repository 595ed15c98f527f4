//! Interaction orchestrator.
//!
//! Owns the `pending -> processing -> {completed | failed}` lifecycle.
//! Submission only persists and enqueues; [`InteractionOrchestrator::process`]
//! does the slow work and is driven by the worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use uuid::Uuid;

use scripto_core::{
    defaults, AiProvider, Error, Interaction, InteractionKind, InteractionRepository,
    InteractionRequest, InteractionStatus, NewInteraction, Result, SubmitReceipt,
};
use scripto_processing::SubjectClassifier;

use crate::handler::{
    InteractionContext, InteractionHandler, InteractionResult, StemSolutionHandler,
    TermDefinitionHandler,
};
use crate::queue::InteractionQueue;

/// Error recorded on records that were mid-flight when the process stopped.
pub const INTERRUPTED_MESSAGE: &str = "Processing was interrupted before completion";

/// Outcome of [`InteractionOrchestrator::recover`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Stale `processing` records marked failed.
    pub failed: usize,
    /// `pending` records put back on the queue.
    pub requeued: usize,
    /// Some `pending` records did not fit in the queue.
    pub more_pending: bool,
}

/// Coordinates persistence, preprocessing and provider calls.
pub struct InteractionOrchestrator {
    repo: Arc<dyn InteractionRepository>,
    queue: InteractionQueue,
    handlers: HashMap<InteractionKind, Arc<dyn InteractionHandler>>,
    timeout: Duration,
}

impl InteractionOrchestrator {
    pub fn new(repo: Arc<dyn InteractionRepository>, queue: InteractionQueue) -> Self {
        Self {
            repo,
            queue,
            handlers: HashMap::new(),
            timeout: Duration::from_secs(defaults::INTERACTION_TIMEOUT_SECS),
        }
    }

    /// Register a handler, replacing any existing one for its kind.
    pub fn with_handler<H: InteractionHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.insert(handler.kind(), Arc::new(handler));
        self
    }

    /// Register the STEM solution and term definition handlers.
    pub fn with_default_handlers(
        self,
        provider: Arc<dyn AiProvider>,
        classifier: Arc<SubjectClassifier>,
    ) -> Self {
        self.with_handler(StemSolutionHandler::new(provider.clone(), classifier.clone()))
            .with_handler(TermDefinitionHandler::new(provider, classifier))
    }

    /// Deadline for one `process` call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn queue(&self) -> &InteractionQueue {
        &self.queue
    }

    /// Accept a request: persist a pending record and enqueue it.
    ///
    /// Never waits on the provider. A full queue fails with
    /// `Error::Unavailable` before anything is written.
    pub async fn submit(
        &self,
        kind: InteractionKind,
        payload: InteractionRequest,
        user_id: Uuid,
    ) -> Result<SubmitReceipt> {
        if payload.text.trim().is_empty() {
            return Err(Error::InvalidInput("Request text must not be empty".to_string()));
        }
        if !self.handlers.contains_key(&kind) {
            return Err(Error::InvalidInput(format!(
                "Unsupported interaction kind: {}",
                kind
            )));
        }

        let slot = self.queue.reserve()?;
        let interaction = self
            .repo
            .insert(NewInteraction {
                user_id,
                kind,
                request: serde_json::to_value(&payload)?,
            })
            .await?;
        slot.enqueue(interaction.id);

        info!(
            subsystem = "jobs",
            component = "orchestrator",
            op = "submit",
            interaction_id = %interaction.id,
            %kind,
            %user_id,
            "Interaction submitted"
        );

        Ok(SubmitReceipt {
            id: interaction.id,
            status: interaction.status,
        })
    }

    /// Run one interaction to a terminal state and return the final record.
    ///
    /// Fails with `Error::InvalidState` if the interaction is not `pending`;
    /// the record is left untouched in that case. Once claimed, the record
    /// is always driven to `completed` or `failed`, even when loading it or
    /// writing the result errors. `Err` is returned only if the failure
    /// itself cannot be recorded.
    pub async fn process(&self, id: Uuid) -> Result<Interaction> {
        if !self.repo.mark_processing(id).await? {
            return match self.repo.get(id).await? {
                Some(existing) => Err(Error::InvalidState(format!(
                    "Interaction {} is {}, expected pending",
                    id, existing.status
                ))),
                None => Err(Error::InteractionNotFound(id)),
            };
        }

        let start = Instant::now();
        let (kind, result) = self.run_claimed(id).await;
        let kind = kind.map_or("unknown", |k| k.as_str());

        match result {
            InteractionResult::Success(response) => match self.repo.complete(id, response).await {
                Ok(true) => {
                    info!(
                        subsystem = "jobs",
                        component = "orchestrator",
                        op = "complete",
                        interaction_id = %id,
                        kind,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Interaction completed"
                    );
                }
                Ok(false) => log_lost_claim(id, "complete"),
                Err(e) => {
                    error!(
                        subsystem = "jobs",
                        component = "orchestrator",
                        op = "complete",
                        interaction_id = %id,
                        kind,
                        error = %e,
                        "Failed to record interaction result"
                    );
                    let message = format!("Failed to record result: {}", e);
                    self.record_failure(id, kind, &message, start).await?;
                }
            },
            InteractionResult::Failed(message) => {
                self.record_failure(id, kind, &message, start).await?;
            }
        }

        self.repo
            .get(id)
            .await?
            .ok_or(Error::InteractionNotFound(id))
    }

    /// Load a claimed record and run its handler under the deadline.
    async fn run_claimed(&self, id: Uuid) -> (Option<InteractionKind>, InteractionResult) {
        let interaction = match self.repo.get(id).await {
            Ok(Some(interaction)) => interaction,
            Ok(None) => {
                return (
                    None,
                    InteractionResult::Failed(Error::InteractionNotFound(id).to_string()),
                )
            }
            Err(e) => {
                return (
                    None,
                    InteractionResult::Failed(format!("Failed to load interaction: {}", e)),
                )
            }
        };
        let kind = interaction.kind;

        let result = match (self.handlers.get(&kind), InteractionContext::new(interaction)) {
            (None, _) => {
                InteractionResult::Failed(format!("No handler for interaction kind: {}", kind))
            }
            (Some(_), Err(e)) => InteractionResult::Failed(e.to_string()),
            (Some(handler), Ok(ctx)) => {
                match tokio::time::timeout(self.timeout, handler.execute(ctx)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            subsystem = "jobs",
                            component = "orchestrator",
                            op = "process",
                            interaction_id = %id,
                            %kind,
                            timeout_secs = self.timeout.as_secs(),
                            "Interaction exceeded timeout"
                        );
                        InteractionResult::Failed(
                            Error::Timeout(format!(
                                "No result after {}s",
                                self.timeout.as_secs()
                            ))
                            .to_string(),
                        )
                    }
                }
            }
        };
        (Some(kind), result)
    }

    async fn record_failure(
        &self,
        id: Uuid,
        kind: &str,
        message: &str,
        start: Instant,
    ) -> Result<()> {
        match self.repo.fail(id, message).await {
            Ok(true) => {
                warn!(
                    subsystem = "jobs",
                    component = "orchestrator",
                    op = "fail",
                    interaction_id = %id,
                    kind,
                    error = %message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Interaction failed"
                );
                Ok(())
            }
            Ok(false) => {
                log_lost_claim(id, "fail");
                Ok(())
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "orchestrator",
                    op = "fail",
                    interaction_id = %id,
                    error = %e,
                    "Failed to record interaction failure"
                );
                Err(e)
            }
        }
    }

    /// Reconcile records left behind by a previous run.
    ///
    /// Nothing is processing when a worker starts, so `processing` rows are
    /// failed. `pending` rows are re-enqueued oldest first while the queue
    /// has room; the rest stay pending for the next pass.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        let stale = self
            .repo
            .ids_with_status(InteractionStatus::Processing, defaults::RECOVERY_BATCH_MAX)
            .await?;
        for id in stale {
            if self.repo.fail(id, INTERRUPTED_MESSAGE).await? {
                report.failed += 1;
            }
        }

        let room = self.queue.available();
        if room > 0 {
            let pending = self
                .repo
                .ids_with_status(InteractionStatus::Pending, room as i64 + 1)
                .await?;
            for id in pending.iter().copied() {
                match self.queue.reserve() {
                    Ok(slot) => {
                        slot.enqueue(id);
                        report.requeued += 1;
                    }
                    Err(_) => break,
                }
            }
            report.more_pending = pending.len() > report.requeued;
        }

        if report.more_pending {
            warn!(
                subsystem = "jobs",
                component = "orchestrator",
                op = "recover",
                requeued = report.requeued,
                "Queue full during recovery, some pending interactions remain"
            );
        }
        info!(
            subsystem = "jobs",
            component = "orchestrator",
            op = "recover",
            failed = report.failed,
            requeued = report.requeued,
            "Recovered interactions from previous run"
        );
        Ok(report)
    }

    /// Fetch an interaction owned by `user_id`.
    ///
    /// Missing and foreign interactions are indistinguishable.
    pub async fn get_status(&self, id: Uuid, user_id: Uuid) -> Result<Interaction> {
        self.repo
            .get_for_user(id, user_id)
            .await?
            .ok_or(Error::InteractionNotFound(id))
    }

    /// The caller's interactions, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Interaction>> {
        let limit = limit.clamp(1, defaults::PAGE_LIMIT_MAX);
        self.repo
            .list_for_user(user_id, limit, offset.max(0))
            .await
    }
}

fn log_lost_claim(id: Uuid, op: &'static str) {
    warn!(
        subsystem = "jobs",
        component = "orchestrator",
        op,
        interaction_id = %id,
        "Interaction left processing before terminal write"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{self, QueueReceiver};
    use async_trait::async_trait;
    use scripto_core::RequestContext;
    use serde_json::Value as JsonValue;
    use scripto_db::InMemoryInteractionRepository;
    use scripto_inference::mock::MockAiProvider;

    fn setup(
        mock: MockAiProvider,
        capacity: usize,
    ) -> (InteractionOrchestrator, QueueReceiver, Arc<InMemoryInteractionRepository>) {
        let repo = Arc::new(InMemoryInteractionRepository::new());
        let (queue, receiver) = queue::channel(capacity);
        let orchestrator = InteractionOrchestrator::new(repo.clone(), queue).with_default_handlers(
            Arc::new(mock),
            Arc::new(SubjectClassifier::without_provider()),
        );
        (orchestrator, receiver, repo)
    }

    #[tokio::test]
    async fn test_submit_persists_pending_and_enqueues() {
        let (orch, mut rx, _repo) = setup(MockAiProvider::new(), 8);
        let user = Uuid::new_v4();
        let payload = InteractionRequest::new("  2 + 2 = ?  ")
            .with_subject("algebra")
            .with_context(RequestContext::default().with_grade_level("college"));

        let receipt = orch
            .submit(InteractionKind::StemSolution, payload.clone(), user)
            .await
            .unwrap();

        assert_eq!(receipt.status, InteractionStatus::Pending);
        assert_eq!(rx.recv().await, Some(receipt.id));

        let stored = orch.get_status(receipt.id, user).await.unwrap();
        assert_eq!(stored.request_payload().unwrap(), payload);
        assert_eq!(stored.request["text"], "2 + 2 = ?");
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_text() {
        let (orch, _rx, repo) = setup(MockAiProvider::new(), 8);
        let err = orch
            .submit(
                InteractionKind::TermDefinition,
                InteractionRequest::new("  "),
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(err.is_client_fault());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_record() {
        let (orch, _rx, repo) = setup(MockAiProvider::new(), 1);
        let user = Uuid::new_v4();

        orch.submit(InteractionKind::TermDefinition, InteractionRequest::new("atom"), user)
            .await
            .unwrap();
        let err = orch
            .submit(InteractionKind::TermDefinition, InteractionRequest::new("ion"), user)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unavailable(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_process_success() {
        let (orch, _rx, _repo) = setup(MockAiProvider::new().with_solution("x = 2"), 8);
        let user = Uuid::new_v4();
        let receipt = orch
            .submit(
                InteractionKind::StemSolution,
                InteractionRequest::new("2x = 4").with_subject("algebra"),
                user,
            )
            .await
            .unwrap();

        let done = orch.process(receipt.id).await.unwrap();
        assert_eq!(done.status, InteractionStatus::Completed);
        assert!(done.error_message.is_none());
        assert!(done.completed_at.is_some());
        assert_eq!(done.response.as_ref().unwrap()["solution"], "x = 2");
        assert!(done.is_consistent());
    }

    #[tokio::test]
    async fn test_process_provider_failure() {
        let (orch, _rx, _repo) = setup(MockAiProvider::new().with_failure("quota exceeded"), 8);
        let user = Uuid::new_v4();
        let receipt = orch
            .submit(InteractionKind::TermDefinition, InteractionRequest::new("atom"), user)
            .await
            .unwrap();

        let done = orch.process(receipt.id).await.unwrap();
        assert_eq!(done.status, InteractionStatus::Failed);
        assert!(done.response.is_none());
        assert!(done.completed_at.is_some());
        assert!(done.error_message.unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_process_twice_is_invalid_state() {
        let (orch, _rx, _repo) = setup(MockAiProvider::new(), 8);
        let receipt = orch
            .submit(
                InteractionKind::TermDefinition,
                InteractionRequest::new("atom"),
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        let first = orch.process(receipt.id).await.unwrap();
        let err = orch.process(receipt.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let after = orch.repo.get(receipt.id).await.unwrap().unwrap();
        assert_eq!(after, first);
    }

    #[tokio::test]
    async fn test_process_unknown_id_is_not_found() {
        let (orch, _rx, _repo) = setup(MockAiProvider::new(), 8);
        let err = orch.process(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::InteractionNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_timeout_fails_interaction() {
        let (orch, _rx, _repo) = setup(MockAiProvider::new().with_latency_ms(120_000), 8);
        let orch = orch.with_timeout(Duration::from_secs(1));
        let receipt = orch
            .submit(
                InteractionKind::StemSolution,
                InteractionRequest::new("1 + 1"),
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        let done = orch.process(receipt.id).await.unwrap();
        assert_eq!(done.status, InteractionStatus::Failed);
        assert!(done.error_message.unwrap().starts_with("AI provider timeout"));
    }

    #[tokio::test]
    async fn test_get_status_hides_foreign_interactions() {
        let (orch, _rx, _repo) = setup(MockAiProvider::new(), 8);
        let owner = Uuid::new_v4();
        let receipt = orch
            .submit(InteractionKind::TermDefinition, InteractionRequest::new("atom"), owner)
            .await
            .unwrap();

        let foreign = orch.get_status(receipt.id, Uuid::new_v4()).await.unwrap_err();
        let missing_id = Uuid::new_v4();
        let missing = orch.get_status(missing_id, owner).await.unwrap_err();

        assert!(matches!(foreign, Error::InteractionNotFound(id) if id == receipt.id));
        assert!(matches!(missing, Error::InteractionNotFound(id) if id == missing_id));
    }

    #[tokio::test]
    async fn test_list_for_user_clamps_limit() {
        let (orch, _rx, _repo) = setup(MockAiProvider::new(), 8);
        let user = Uuid::new_v4();
        for term in ["atom", "ion", "molecule"] {
            orch.submit(InteractionKind::TermDefinition, InteractionRequest::new(term), user)
                .await
                .unwrap();
        }

        assert_eq!(orch.list_for_user(user, 0, 0).await.unwrap().len(), 1);
        assert_eq!(orch.list_for_user(user, 50, 0).await.unwrap().len(), 3);
        assert_eq!(orch.list_for_user(user, 50, -5).await.unwrap().len(), 3);
        assert!(orch.list_for_user(Uuid::new_v4(), 50, 0).await.unwrap().is_empty());
    }

    /// Delegates to the in-memory repository but cannot store results.
    struct UnwritableResults {
        inner: InMemoryInteractionRepository,
    }

    #[async_trait]
    impl InteractionRepository for UnwritableResults {
        async fn insert(&self, new: NewInteraction) -> Result<Interaction> {
            self.inner.insert(new).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Interaction>> {
            self.inner.get(id).await
        }

        async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Interaction>> {
            self.inner.get_for_user(id, user_id).await
        }

        async fn mark_processing(&self, id: Uuid) -> Result<bool> {
            self.inner.mark_processing(id).await
        }

        async fn complete(&self, _id: Uuid, _response: JsonValue) -> Result<bool> {
            Err(Error::Internal("unsupported Unicode escape sequence".to_string()))
        }

        async fn fail(&self, id: Uuid, error: &str) -> Result<bool> {
            self.inner.fail(id, error).await
        }

        async fn list_for_user(
            &self,
            user_id: Uuid,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<Interaction>> {
            self.inner.list_for_user(user_id, limit, offset).await
        }

        async fn ids_with_status(
            &self,
            status: InteractionStatus,
            limit: i64,
        ) -> Result<Vec<Uuid>> {
            self.inner.ids_with_status(status, limit).await
        }
    }

    #[tokio::test]
    async fn test_result_write_error_fails_interaction() {
        let repo = Arc::new(UnwritableResults {
            inner: InMemoryInteractionRepository::new(),
        });
        let (queue, _rx) = queue::channel(8);
        let orch = InteractionOrchestrator::new(repo.clone(), queue).with_default_handlers(
            Arc::new(MockAiProvider::new()),
            Arc::new(SubjectClassifier::without_provider()),
        );
        let receipt = orch
            .submit(
                InteractionKind::TermDefinition,
                InteractionRequest::new("atom"),
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        let done = orch.process(receipt.id).await.unwrap();
        assert_eq!(done.status, InteractionStatus::Failed);
        assert!(done.response.is_none());
        assert!(done.completed_at.is_some());
        let message = done.error_message.unwrap();
        assert!(message.starts_with("Failed to record result"));
        assert!(message.contains("unsupported Unicode escape sequence"));
    }

    #[tokio::test]
    async fn test_recover_fails_stale_and_requeues_pending() {
        let (orch, mut rx, repo) = setup(MockAiProvider::new(), 8);
        let user = Uuid::new_v4();
        let mut ids = Vec::new();
        for term in ["atom", "ion", "molecule"] {
            let receipt = orch
                .submit(InteractionKind::TermDefinition, InteractionRequest::new(term), user)
                .await
                .unwrap();
            ids.push(receipt.id);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        // simulate a restart: the old queue contents are gone
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }
        repo.mark_processing(ids[0]).await.unwrap();

        let report = orch.recover().await.unwrap();
        assert_eq!(
            report,
            RecoveryReport {
                failed: 1,
                requeued: 2,
                more_pending: false,
            }
        );

        let stale = repo.get(ids[0]).await.unwrap().unwrap();
        assert_eq!(stale.status, InteractionStatus::Failed);
        assert_eq!(stale.error_message.as_deref(), Some(INTERRUPTED_MESSAGE));
        assert!(stale.is_consistent());

        assert_eq!(rx.recv().await, Some(ids[1]));
        assert_eq!(rx.recv().await, Some(ids[2]));
        assert_eq!(orch.queue().available(), 8);
    }

    #[tokio::test]
    async fn test_recover_leaves_overflow_pending() {
        let (orch, mut rx, repo) = setup(MockAiProvider::new(), 2);
        let user = Uuid::new_v4();
        let mut ids = Vec::new();
        for term in ["atom", "ion"] {
            ids.push(
                orch.submit(InteractionKind::TermDefinition, InteractionRequest::new(term), user)
                    .await
                    .unwrap()
                    .id,
            );
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        rx.recv().await.unwrap();
        // one slot free, two pending records
        let report = orch.recover().await.unwrap();
        assert_eq!(report.requeued, 1);
        assert!(report.more_pending);
        assert_eq!(report.failed, 0);
        assert_eq!(orch.queue().available(), 0);

        let pending = repo
            .ids_with_status(InteractionStatus::Pending, 10)
            .await
            .unwrap();
        assert_eq!(pending, ids);
    }
}
