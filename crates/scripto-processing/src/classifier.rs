//! Subject classification.
//!
//! A matching hint always wins without touching the provider. Provider
//! classification is best-effort: every failure degrades to
//! [`Subject::FALLBACK`].

use std::sync::Arc;

use tracing::{debug, warn};

use scripto_core::{defaults, AiProvider, CompletionParams, Subject};

/// System prompt for subject classification.
pub const CLASSIFIER_SYSTEM_PROMPT: &str =
    "You are a STEM subject classifier. Respond only with the subject name.";

/// Build the classification prompt for a piece of text.
pub fn classification_prompt(text: &str) -> String {
    format!(
        "<content>\n{}\n</content>\n\
         <supported_subjects>{}</supported_subjects>\n\
         <instructions>\n\
         Respond with ONLY the single best matching subject name from the list, in lowercase. \
         If uncertain, respond with \"general math\".\n\
         </instructions>",
        text,
        Subject::supported_list()
    )
}

/// Resolves a [`Subject`] from a hint or, failing that, the AI provider.
#[derive(Clone)]
pub struct SubjectClassifier {
    provider: Option<Arc<dyn AiProvider>>,
    temperature: f32,
}

impl SubjectClassifier {
    /// Classifier that can fall back to the given provider.
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self {
            provider: Some(provider),
            temperature: defaults::AI_CLASSIFY_TEMPERATURE,
        }
    }

    /// Classifier that only honours hints.
    pub fn without_provider() -> Self {
        Self {
            provider: None,
            temperature: defaults::AI_CLASSIFY_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Resolve the subject of `text`. Never fails.
    pub async fn resolve(&self, text: &str, hint: Option<&str>) -> Subject {
        if let Some(subject) = hint.and_then(Subject::parse) {
            debug!(subsystem = "processing", component = "classifier", subject = %subject, "Subject from hint");
            return subject;
        }

        let Some(provider) = &self.provider else {
            return Subject::FALLBACK;
        };

        let params = CompletionParams::new()
            .with_temperature(self.temperature)
            .with_system(CLASSIFIER_SYSTEM_PROMPT);

        match provider
            .generate_completion(&classification_prompt(text), params)
            .await
        {
            Ok(raw) => match parse_response(&raw) {
                Some(subject) => {
                    debug!(
                        subsystem = "processing",
                        component = "classifier",
                        subject = %subject,
                        "Subject from provider"
                    );
                    subject
                }
                None => {
                    debug!(
                        subsystem = "processing",
                        component = "classifier",
                        response = %raw.trim(),
                        "Unrecognized classification, using fallback"
                    );
                    Subject::FALLBACK
                }
            },
            Err(e) => {
                warn!(
                    subsystem = "processing",
                    component = "classifier",
                    error = %e,
                    "Subject classification failed, using fallback"
                );
                Subject::FALLBACK
            }
        }
    }
}

/// Tolerates quotes, trailing punctuation and case in the model reply.
fn parse_response(raw: &str) -> Option<Subject> {
    let trimmed = raw.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.' | '*'));
    Subject::parse(trimmed)
}
