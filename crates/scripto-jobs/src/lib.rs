//! # scripto-jobs
//!
//! Asynchronous interaction processing for the ScriptO AI pipeline.
//!
//! Requests are accepted by [`InteractionOrchestrator::submit`], which
//! persists a `pending` record and pushes its id onto a bounded queue.
//! An [`InteractionWorker`] drains the queue in the background and records
//! the terminal outcome.

pub mod handler;
pub mod orchestrator;
pub mod queue;
pub mod worker;

pub use handler::{
    InteractionContext, InteractionHandler, InteractionResult, StemSolutionHandler,
    TermDefinitionHandler,
};
pub use orchestrator::{InteractionOrchestrator, RecoveryReport, INTERRUPTED_MESSAGE};
pub use queue::{InteractionQueue, QueueReceiver, QueueSlot};
pub use worker::{InteractionWorker, WorkerConfig, WorkerEvent, WorkerHandle};
