//! Anthropic Messages API provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use scripto_core::{
    defaults, AiProvider, CompletionParams, DefinitionContext, Error, Result, StemSolution,
    TermDefinition,
};

use super::error::{to_scripto_error, AnthropicErrorCode};
use super::types::*;
use crate::config::AiConfig;
use crate::prompts;

/// A failed upstream call and whether another model might succeed.
struct CallFailure {
    error: Error,
    retryable: bool,
}

impl CallFailure {
    fn fatal(error: Error) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

/// Prefix provider and timeout messages with the failing operation.
fn with_operation(err: Error, operation: &str) -> Error {
    match err {
        Error::Provider(msg) => Error::Provider(format!("{}: {}", operation, msg)),
        Error::Timeout(msg) => Error::Timeout(format!("{}: {}", operation, msg)),
        other => other,
    }
}

/// AI provider backed by the Anthropic Messages API.
pub struct AnthropicBackend {
    client: Client,
    config: AiConfig,
}

impl AnthropicBackend {
    /// Create a new backend. Fails if the configuration is invalid.
    pub fn new(config: AiConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            provider = "anthropic",
            url = %config.base_url,
            model = %config.default_model,
            fallback = ?config.fallback_model,
            "Initializing Anthropic backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(AiConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// Attach authentication and version headers.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.anthropic_version)
    }

    async fn send(&self, request: &MessagesRequest) -> std::result::Result<String, CallFailure> {
        let response = self
            .authorize(self.client.post(self.url("/messages")))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallFailure::fatal(Error::Timeout(format!(
                        "No response after {}s",
                        self.config.timeout_secs
                    )))
                } else {
                    CallFailure::fatal(Error::Provider(format!("Request failed: {}", e)))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let (error_type, message) = match response.json::<AnthropicErrorResponse>().await {
                Ok(body) => (body.error.error_type, body.error.message),
                Err(_) => ("unknown".to_string(), format!("HTTP {}", status)),
            };
            let code = AnthropicErrorCode::from_response(status.as_u16(), &error_type);
            return Err(CallFailure {
                error: to_scripto_error(code, &message),
                retryable: code.is_retryable(),
            });
        }

        let result: MessagesResponse = response.json().await.map_err(|e| {
            CallFailure::fatal(Error::Provider(format!("Failed to parse response: {}", e)))
        })?;

        if let Some(usage) = &result.usage {
            debug!(
                model = %result.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = ?result.stop_reason,
                "Completion finished"
            );
        }

        let text = result.text();
        if text.trim().is_empty() {
            return Err(CallFailure::fatal(Error::Provider(
                "Empty response from model".to_string(),
            )));
        }
        Ok(text)
    }

    /// Run one completion, falling back to the secondary model once when
    /// the default model fails with a retryable error.
    async fn complete(&self, prompt: &str, params: CompletionParams) -> Result<String> {
        let pinned = params.model.is_some();
        let model = params
            .model
            .unwrap_or_else(|| self.config.default_model.clone());

        let mut request = MessagesRequest {
            model,
            max_tokens: params.max_tokens.unwrap_or(self.config.max_tokens),
            messages: vec![Message::user(prompt)],
            system: params.system,
            temperature: Some(
                params
                    .temperature
                    .unwrap_or(self.config.default_temperature),
            ),
        };

        debug!(
            model = %request.model,
            prompt_len = prompt.len(),
            "Sending completion request"
        );

        match self.send(&request).await {
            Ok(text) => Ok(text),
            Err(failure) => {
                let fallback = self
                    .config
                    .fallback_model
                    .as_ref()
                    .filter(|m| !pinned && failure.retryable && **m != request.model);
                let Some(fallback) = fallback else {
                    return Err(failure.error);
                };
                warn!(
                    model = %request.model,
                    fallback = %fallback,
                    error = %failure.error,
                    "Primary model failed, retrying with fallback"
                );
                request.model = fallback.clone();
                self.send(&request).await.map_err(|f| f.error)
            }
        }
    }
}

#[async_trait]
impl AiProvider for AnthropicBackend {
    async fn generate_completion(&self, prompt: &str, params: CompletionParams) -> Result<String> {
        self.complete(prompt, params).await
    }

    async fn solve_stem_problem(&self, problem: &str, subject: &str) -> Result<StemSolution> {
        let params = CompletionParams::new()
            .with_temperature(self.config.stem_temperature)
            .with_system(prompts::STEM_SYSTEM_PROMPT);

        let solution = self
            .complete(&prompts::stem_prompt(problem, subject), params)
            .await
            .map_err(|e| with_operation(e, "Failed to solve STEM problem"))?;

        Ok(StemSolution {
            solution,
            subject: subject.to_string(),
        })
    }

    async fn define_term(
        &self,
        term: &str,
        context: &DefinitionContext,
    ) -> Result<TermDefinition> {
        let context = context.resolved();
        let params = CompletionParams::new()
            .with_temperature(self.config.definition_temperature)
            .with_system(prompts::DEFINITION_SYSTEM_PROMPT);
        let prompt = prompts::definition_prompt(
            term,
            context.grade_level_or_default(),
            context.subject_or_default(),
        );

        let definition = self
            .complete(&prompt, params)
            .await
            .map_err(|e| with_operation(e, "Failed to define term"))?;

        Ok(TermDefinition {
            definition,
            term: term.to_string(),
            context,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.default_model
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .authorize(self.client.get(self.url("/models")))
            .timeout(Duration::from_secs(defaults::AI_HEALTH_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("Anthropic health check passed");
                Ok(true)
            }
            Ok(resp) => {
                warn!("Anthropic health check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Anthropic health check error: {}", e);
                Ok(false)
            }
        }
    }
}
