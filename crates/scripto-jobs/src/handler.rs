//! Interaction handlers for each interaction kind.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use scripto_core::{
    AiProvider, AiResult, DefinitionContext, Interaction, InteractionKind, InteractionOutput,
    InteractionRequest, Result,
};
use scripto_processing::{Preprocessor, ProblemPreprocessor, SubjectClassifier, TermPreprocessor};

/// Context provided to interaction handlers.
pub struct InteractionContext {
    /// The interaction being processed (already `processing`).
    pub interaction: Interaction,
    /// Decoded request payload.
    pub request: InteractionRequest,
}

impl InteractionContext {
    pub fn new(interaction: Interaction) -> Result<Self> {
        let request = interaction.request_payload()?;
        Ok(Self {
            interaction,
            request,
        })
    }
}

/// Result of handling one interaction.
#[derive(Debug)]
pub enum InteractionResult {
    /// Response payload to store on the completed record.
    Success(JsonValue),
    /// Error message to store on the failed record.
    Failed(String),
}

impl From<Result<JsonValue>> for InteractionResult {
    fn from(result: Result<JsonValue>) -> Self {
        match result {
            Ok(value) => InteractionResult::Success(value),
            Err(e) => InteractionResult::Failed(e.to_string()),
        }
    }
}

/// Trait for interaction handlers.
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    /// The interaction kind this handler processes.
    fn kind(&self) -> InteractionKind;

    /// Preprocess and call the provider.
    async fn execute(&self, ctx: InteractionContext) -> InteractionResult;

    fn can_handle(&self, kind: InteractionKind) -> bool {
        self.kind() == kind
    }
}

fn output(result: AiResult, model: &str, analysis: &impl serde::Serialize) -> Result<JsonValue> {
    let output = InteractionOutput {
        result,
        model: model.to_string(),
        analysis: serde_json::to_value(analysis)?,
    };
    Ok(serde_json::to_value(&output)?)
}

/// Solves STEM problems.
pub struct StemSolutionHandler {
    preprocessor: ProblemPreprocessor,
    provider: Arc<dyn AiProvider>,
}

impl StemSolutionHandler {
    pub fn new(provider: Arc<dyn AiProvider>, classifier: Arc<SubjectClassifier>) -> Self {
        Self {
            preprocessor: ProblemPreprocessor::new(classifier),
            provider,
        }
    }

    async fn run(&self, request: &InteractionRequest) -> Result<JsonValue> {
        let analysis = self.preprocessor.process(request).await?;
        debug!(
            subsystem = "jobs",
            component = "stem_solution",
            subject = %analysis.subject,
            has_equations = analysis.has_equations,
            "Solving problem"
        );
        let solution = self
            .provider
            .solve_stem_problem(&analysis.processed_text, analysis.subject.as_str())
            .await?;
        output(
            AiResult::StemSolution(solution),
            self.provider.model_name(),
            &analysis,
        )
    }
}

#[async_trait]
impl InteractionHandler for StemSolutionHandler {
    fn kind(&self) -> InteractionKind {
        InteractionKind::StemSolution
    }

    async fn execute(&self, ctx: InteractionContext) -> InteractionResult {
        self.run(&ctx.request).await.into()
    }
}

/// Defines vocabulary terms.
pub struct TermDefinitionHandler {
    preprocessor: TermPreprocessor,
    provider: Arc<dyn AiProvider>,
}

impl TermDefinitionHandler {
    pub fn new(provider: Arc<dyn AiProvider>, classifier: Arc<SubjectClassifier>) -> Self {
        Self {
            preprocessor: TermPreprocessor::new(classifier),
            provider,
        }
    }

    async fn run(&self, request: &InteractionRequest) -> Result<JsonValue> {
        let analysis = self.preprocessor.process(request).await?;
        let context = DefinitionContext::from(&analysis);
        debug!(
            subsystem = "jobs",
            component = "term_definition",
            subject = %analysis.subject,
            grade_level = %analysis.grade_level,
            "Defining term"
        );
        let definition = self
            .provider
            .define_term(&analysis.processed_term, &context)
            .await?;
        output(
            AiResult::TermDefinition(definition),
            self.provider.model_name(),
            &analysis,
        )
    }
}

#[async_trait]
impl InteractionHandler for TermDefinitionHandler {
    fn kind(&self) -> InteractionKind {
        InteractionKind::TermDefinition
    }

    async fn execute(&self, ctx: InteractionContext) -> InteractionResult {
        self.run(&ctx.request).await.into()
    }
}
