//! STEM problem preprocessing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use scripto_core::{Error, InteractionRequest, ProblemAnalysis, Result};

use crate::classifier::SubjectClassifier;
use crate::normalizer::{clean_text, extract_math_expressions, normalize_math_symbols};
use crate::Preprocessor;

/// Normalizes a problem, extracts its expressions and resolves its subject.
pub struct ProblemPreprocessor {
    classifier: Arc<SubjectClassifier>,
}

impl ProblemPreprocessor {
    pub fn new(classifier: Arc<SubjectClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Preprocessor for ProblemPreprocessor {
    type Output = ProblemAnalysis;

    async fn process(&self, request: &InteractionRequest) -> Result<ProblemAnalysis> {
        let cleaned = clean_text(&request.text);
        if cleaned.is_empty() {
            return Err(Error::Processing("Problem text is empty".to_string()));
        }

        let processed_text = normalize_math_symbols(&cleaned);
        let math_expressions = extract_math_expressions(&processed_text);
        let subject = self
            .classifier
            .resolve(&processed_text, request.subject_hint())
            .await;

        debug!(
            subsystem = "processing",
            component = "problem",
            subject = %subject,
            expressions = math_expressions.len(),
            "Problem preprocessed"
        );

        Ok(ProblemAnalysis {
            has_equations: !math_expressions.is_empty(),
            processed_text,
            math_expressions,
            subject,
        })
    }
}
