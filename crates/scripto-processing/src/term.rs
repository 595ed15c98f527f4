//! Vocabulary term preprocessing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use scripto_core::{defaults, Error, InteractionRequest, Result, TermAnalysis};

use crate::classifier::SubjectClassifier;
use crate::normalizer::clean_text;
use crate::Preprocessor;

/// Lowercases a term, resolves its subject and fills in the grade level.
pub struct TermPreprocessor {
    classifier: Arc<SubjectClassifier>,
}

impl TermPreprocessor {
    pub fn new(classifier: Arc<SubjectClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Preprocessor for TermPreprocessor {
    type Output = TermAnalysis;

    async fn process(&self, request: &InteractionRequest) -> Result<TermAnalysis> {
        let processed_term = clean_text(&request.text).to_lowercase();
        if processed_term.is_empty() {
            return Err(Error::Processing("Term is empty".to_string()));
        }

        let subject = self
            .classifier
            .resolve(&processed_term, request.subject_hint())
            .await;
        let grade_level = request
            .grade_level()
            .map(clean_text)
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| defaults::GRADE_LEVEL.to_string());

        debug!(
            subsystem = "processing",
            component = "term",
            subject = %subject,
            grade_level = %grade_level,
            "Term preprocessed"
        );

        Ok(TermAnalysis {
            processed_term,
            subject,
            grade_level,
            // Related-term lookup is not implemented yet.
            related_terms: Vec::new(),
        })
    }
}
