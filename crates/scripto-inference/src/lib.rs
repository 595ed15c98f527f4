//! # scripto-inference
//!
//! AI provider adapters for the ScriptO AI pipeline.
//!
//! - [`anthropic::AnthropicBackend`]: production provider over the
//!   Anthropic Messages API
//! - [`mock::MockAiProvider`]: deterministic provider for tests
//!   (feature `mock`)

pub mod anthropic;
pub mod config;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod prompts;

pub use anthropic::AnthropicBackend;
pub use config::AiConfig;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockAiProvider;
