//! Mock AI provider for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scripto_core::{AiProvider, CompletionParams};
//! use scripto_inference::mock::MockAiProvider;
//!
//! #[tokio::test]
//! async fn test_with_mock_provider() {
//!     let provider = MockAiProvider::new()
//!         .with_response_mapping("classify", "physics")
//!         .with_latency_ms(50);
//!
//!     let reply = provider
//!         .generate_completion("please classify this", CompletionParams::new())
//!         .await
//!         .unwrap();
//!     assert_eq!(reply, "physics");
//! }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scripto_core::{
    defaults, AiProvider, CompletionParams, DefinitionContext, Error, Result, StemSolution,
    TermDefinition,
};

/// Mock AI provider for testing.
#[derive(Clone)]
pub struct MockAiProvider {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    model: String,
    response_mappings: Vec<(String, String)>,
    default_response: String,
    solution: String,
    definition: String,
    latency_ms: u64,
    failure: Option<MockFailure>,
    healthy: bool,
}

/// Failure injected into every call.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Return `Error::Provider` with this message.
    Provider(String),
    /// Return `Error::Timeout`.
    Timeout,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
    pub params: Option<CompletionParams>,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: defaults::AI_MODEL.to_string(),
            response_mappings: Vec::new(),
            default_response: "Mock response".to_string(),
            solution: "## Solution\n\nMock solution".to_string(),
            definition: "## Definition\n\nMock definition".to_string(),
            latency_ms: 0,
            failure: None,
            healthy: true,
        }
    }
}

impl MockAiProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    /// Set the default completion response.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Return `output` for any completion whose prompt contains `needle`.
    /// The first matching mapping wins.
    pub fn with_response_mapping(
        mut self,
        needle: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .response_mappings
            .push((needle.into(), output.into()));
        self
    }

    /// Set the markdown returned by `solve_stem_problem`.
    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).solution = solution.into();
        self
    }

    /// Set the markdown returned by `define_term`.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).definition = definition.into();
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Make every call fail with a provider error.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(MockFailure::Provider(message.into()));
        self
    }

    /// Make every call fail with a timeout.
    pub fn with_timeout_failure(mut self) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(MockFailure::Timeout);
        self
    }

    /// Report the provider as unreachable from `health_check`.
    pub fn with_unhealthy(mut self) -> Self {
        Arc::make_mut(&mut self.config).healthy = false;
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    fn count(&self, operation: &str) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Get number of raw completion calls.
    pub fn generate_call_count(&self) -> usize {
        self.count("generate")
    }

    /// Get number of solve calls.
    pub fn solve_call_count(&self) -> usize {
        self.count("solve")
    }

    /// Get number of define calls.
    pub fn define_call_count(&self) -> usize {
        self.count("define")
    }

    fn log_call(&self, operation: &str, input: &str, params: Option<CompletionParams>) {
        self.call_log.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
            params,
            timestamp: std::time::Instant::now(),
        });
    }

    async fn simulate(&self) -> Result<()> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
        match &self.config.failure {
            Some(MockFailure::Provider(msg)) => Err(Error::Provider(msg.clone())),
            Some(MockFailure::Timeout) => Err(Error::Timeout("Simulated timeout".to_string())),
            None => Ok(()),
        }
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate_completion(&self, prompt: &str, params: CompletionParams) -> Result<String> {
        self.log_call("generate", prompt, Some(params));
        self.simulate().await?;

        let mapped = self
            .config
            .response_mappings
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, output)| output.clone());
        Ok(mapped.unwrap_or_else(|| self.config.default_response.clone()))
    }

    async fn solve_stem_problem(&self, problem: &str, subject: &str) -> Result<StemSolution> {
        self.log_call("solve", problem, None);
        self.simulate().await?;

        Ok(StemSolution {
            solution: self.config.solution.clone(),
            subject: subject.to_string(),
        })
    }

    async fn define_term(
        &self,
        term: &str,
        context: &DefinitionContext,
    ) -> Result<TermDefinition> {
        self.log_call("define", term, None);
        self.simulate().await?;

        Ok(TermDefinition {
            definition: self.config.definition.clone(),
            term: term.to_string(),
            context: context.resolved(),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }
}
