//! AI provider configuration.
//!
//! Values come from the environment with compiled-in defaults. A missing
//! API key is not an error until [`AiConfig::validate`] runs, which the
//! backend constructor always does.

use scripto_core::{defaults, Error, Result};

/// Configuration for the Anthropic-backed provider.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// Base URL for the Messages API.
    pub base_url: String,
    /// Value of the `anthropic-version` header.
    pub anthropic_version: String,
    /// Model used when a call does not pin one.
    pub default_model: String,
    /// Model tried once when the default model fails with a retryable error.
    pub fallback_model: Option<String>,
    /// Output token cap per completion.
    pub max_tokens: u32,
    /// Temperature for raw completions.
    pub default_temperature: f32,
    /// Temperature for STEM solutions.
    pub stem_temperature: f32,
    /// Temperature for term definitions.
    pub definition_temperature: f32,
    /// Temperature for subject classification.
    pub classify_temperature: f32,
    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: defaults::ANTHROPIC_URL.to_string(),
            anthropic_version: defaults::ANTHROPIC_VERSION.to_string(),
            default_model: defaults::AI_MODEL.to_string(),
            fallback_model: Some(defaults::AI_FALLBACK_MODEL.to_string()),
            max_tokens: defaults::AI_MAX_TOKENS,
            default_temperature: defaults::AI_DEFAULT_TEMPERATURE,
            stem_temperature: defaults::AI_STEM_TEMPERATURE,
            definition_temperature: defaults::AI_DEFINITION_TEMPERATURE,
            classify_temperature: defaults::AI_CLASSIFY_TEMPERATURE,
            timeout_secs: defaults::AI_TIMEOUT_SECS,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl AiConfig {
    /// Create a config with the given key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `ANTHROPIC_API_KEY` (or `CLAUDE_API_KEY`)
    /// - `ANTHROPIC_BASE_URL`, `ANTHROPIC_VERSION`
    /// - `AI_DEFAULT_MODEL`, `AI_FALLBACK_MODEL` (empty disables fallback)
    /// - `AI_MAX_TOKENS`, `AI_REQUEST_TIMEOUT_SECS`
    /// - `AI_DEFAULT_TEMPERATURE`, `AI_STEM_TEMPERATURE`, `AI_DEFINITION_TEMPERATURE`,
    ///   `AI_CLASSIFY_TEMPERATURE`
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY")
                .or_else(|_| std::env::var("CLAUDE_API_KEY"))
                .unwrap_or_default(),
            base_url: std::env::var("ANTHROPIC_BASE_URL").unwrap_or(base.base_url),
            anthropic_version: std::env::var("ANTHROPIC_VERSION")
                .unwrap_or(base.anthropic_version),
            default_model: std::env::var("AI_DEFAULT_MODEL").unwrap_or(base.default_model),
            fallback_model: match std::env::var("AI_FALLBACK_MODEL") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => base.fallback_model,
            },
            max_tokens: env_parse("AI_MAX_TOKENS").unwrap_or(base.max_tokens),
            default_temperature: env_parse("AI_DEFAULT_TEMPERATURE")
                .unwrap_or(base.default_temperature),
            stem_temperature: env_parse("AI_STEM_TEMPERATURE").unwrap_or(base.stem_temperature),
            definition_temperature: env_parse("AI_DEFINITION_TEMPERATURE")
                .unwrap_or(base.definition_temperature),
            classify_temperature: env_parse("AI_CLASSIFY_TEMPERATURE")
                .unwrap_or(base.classify_temperature),
            timeout_secs: env_parse("AI_REQUEST_TIMEOUT_SECS").unwrap_or(base.timeout_secs),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_fallback_model(mut self, model: Option<String>) -> Self {
        self.fallback_model = model;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Reject configurations the provider cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config(
                "ANTHROPIC_API_KEY is not set".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Invalid provider base URL: {}",
                self.base_url
            )));
        }
        if self.default_model.trim().is_empty() {
            return Err(Error::Config("Default model must not be empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be positive".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("Request timeout must be positive".to_string()));
        }
        for (name, value) in [
            ("default_temperature", self.default_temperature),
            ("stem_temperature", self.stem_temperature),
            ("definition_temperature", self.definition_temperature),
            ("classify_temperature", self.classify_temperature),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be between 0.0 and 1.0 (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
