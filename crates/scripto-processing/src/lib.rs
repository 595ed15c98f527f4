//! # scripto-processing
//!
//! Deterministic preprocessing for the ScriptO AI pipeline.
//!
//! - [`normalizer`]: whitespace cleanup, operator normalization and math
//!   expression extraction
//! - [`SubjectClassifier`]: hint-first subject resolution with best-effort
//!   provider fallback
//! - [`ProblemPreprocessor`] and [`TermPreprocessor`]: the two content kinds

use async_trait::async_trait;
use serde::Serialize;

use scripto_core::{InteractionRequest, Result};

pub mod classifier;
pub mod normalizer;
pub mod problem;
pub mod term;

pub use classifier::SubjectClassifier;
pub use problem::ProblemPreprocessor;
pub use term::TermPreprocessor;

/// Turns a raw request into a structured analysis for prompting.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    type Output: Serialize + Send;

    /// Preprocess the request text using its subject hint and context.
    ///
    /// Fails with `Error::Processing` when nothing is left after cleanup.
    async fn process(&self, request: &InteractionRequest) -> Result<Self::Output>;
}
