//! Interaction worker.
//!
//! Pulls interaction ids off the queue and drives each through
//! [`InteractionOrchestrator::process`], up to `max_concurrent` at a time.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use scripto_core::{defaults, InteractionKind, InteractionStatus};

use crate::orchestrator::InteractionOrchestrator;
use crate::queue::QueueReceiver;

/// Configuration for the interaction worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Whether to process interactions at all.
    pub enabled: bool,
    /// Maximum number of interactions processed concurrently.
    pub max_concurrent: usize,
    /// Capacity of the submission queue.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent: defaults::WORKER_MAX_CONCURRENT,
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `AI_WORKER_ENABLED` | `true` | Enable/disable interaction processing |
    /// | `AI_WORKER_MAX_CONCURRENT` | `4` | Max concurrent interactions |
    /// | `AI_QUEUE_CAPACITY` | `256` | Pending interactions accepted before 503 |
    pub fn from_env() -> Self {
        let enabled = std::env::var("AI_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var("AI_WORKER_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::WORKER_MAX_CONCURRENT)
            .max(1);

        let queue_capacity = std::env::var("AI_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::QUEUE_CAPACITY)
            .max(1);

        Self {
            enabled,
            max_concurrent,
            queue_capacity,
        }
    }

    /// Set maximum concurrent interactions.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Enable or disable processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the interaction worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// An interaction moved to `processing`.
    InteractionStarted { id: Uuid },
    /// An interaction reached `completed`.
    InteractionCompleted { id: Uuid, kind: InteractionKind },
    /// An interaction reached `failed`.
    InteractionFailed {
        id: Uuid,
        kind: InteractionKind,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
///
/// Dropping the handle detaches the worker: it keeps running until the
/// queue closes.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop taking new interactions and wait for in-flight ones to finish.
    ///
    /// Interactions still queued stay `pending` until the next worker's
    /// recovery pass re-enqueues them.
    pub async fn shutdown(self) {
        // A disabled worker has already exited and dropped the receiver.
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.join.await {
            error!(
                subsystem = "jobs",
                component = "worker",
                error = ?e,
                "Interaction worker task panicked"
            );
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Background worker that processes queued interactions.
pub struct InteractionWorker {
    orchestrator: Arc<InteractionOrchestrator>,
    receiver: QueueReceiver,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl InteractionWorker {
    pub fn new(
        orchestrator: Arc<InteractionOrchestrator>,
        receiver: QueueReceiver,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            orchestrator,
            receiver,
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();
        let join = tokio::spawn(self.run(shutdown_rx));

        WorkerHandle {
            shutdown_tx,
            event_rx,
            join,
        }
    }

    #[instrument(skip(self, shutdown_rx))]
    async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(
                subsystem = "jobs",
                component = "worker",
                "Interaction worker is disabled, not starting"
            );
            return;
        }

        if let Err(e) = self.orchestrator.recover().await {
            error!(
                subsystem = "jobs",
                component = "worker",
                op = "recover",
                error = %e,
                "Failed to recover interactions from previous run"
            );
        }

        let max_concurrent = self.config.max_concurrent.max(1);
        info!(
            subsystem = "jobs",
            component = "worker",
            max_concurrent,
            queue_capacity = self.orchestrator.queue().max_capacity(),
            "Interaction worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                // None means the handle was dropped; keep serving the queue.
                Some(()) = shutdown_rx.recv() => {
                    info!(
                        subsystem = "jobs",
                        component = "worker",
                        "Interaction worker received shutdown signal"
                    );
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(
                            subsystem = "jobs",
                            component = "worker",
                            error = ?e,
                            "Interaction task panicked"
                        );
                    }
                }
                next = self.receiver.recv(), if tasks.len() < max_concurrent => {
                    match next {
                        Some(id) => {
                            let worker = self.clone_refs();
                            tasks.spawn(worker.execute(id));
                        }
                        None => {
                            info!(
                                subsystem = "jobs",
                                component = "worker",
                                "Interaction queue closed"
                            );
                            break;
                        }
                    }
                }
            }
        }

        if !tasks.is_empty() {
            debug!(
                subsystem = "jobs",
                component = "worker",
                in_flight = tasks.len(),
                "Draining in-flight interactions"
            );
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(
                    subsystem = "jobs",
                    component = "worker",
                    error = ?e,
                    "Interaction task panicked"
                );
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!(subsystem = "jobs", component = "worker", "Interaction worker stopped");
    }

    fn clone_refs(&self) -> InteractionWorkerRef {
        InteractionWorkerRef {
            orchestrator: self.orchestrator.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

/// Reference bundle for processing one interaction in a spawned task.
struct InteractionWorkerRef {
    orchestrator: Arc<InteractionOrchestrator>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl InteractionWorkerRef {
    async fn execute(self, id: Uuid) {
        let _ = self.event_tx.send(WorkerEvent::InteractionStarted { id });

        match self.orchestrator.process(id).await {
            Ok(interaction) => {
                let kind = interaction.kind;
                let event = match interaction.status {
                    InteractionStatus::Completed => WorkerEvent::InteractionCompleted { id, kind },
                    InteractionStatus::Failed => WorkerEvent::InteractionFailed {
                        id,
                        kind,
                        error: interaction.error_message.unwrap_or_default(),
                    },
                    status => {
                        debug!(
                            subsystem = "jobs",
                            component = "worker",
                            interaction_id = %id,
                            %status,
                            "Interaction not terminal after processing"
                        );
                        return;
                    }
                };
                let _ = self.event_tx.send(event);
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "worker",
                    op = "process",
                    interaction_id = %id,
                    error = %e,
                    "Failed to process interaction"
                );
            }
        }
    }
}
