//! Core data models for the ScriptO AI pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// SUBJECTS
// =============================================================================

/// Coarse academic subject used to tailor prompts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "algebra")]
    Algebra,
    #[serde(rename = "geometry")]
    Geometry,
    #[serde(rename = "calculus")]
    Calculus,
    #[serde(rename = "physics")]
    Physics,
    #[serde(rename = "chemistry")]
    Chemistry,
    #[serde(rename = "biology")]
    Biology,
    #[serde(rename = "statistics")]
    Statistics,
    #[serde(rename = "computer science")]
    ComputerScience,
    /// Fallback whenever detection is unavailable or inconclusive.
    #[default]
    #[serde(rename = "general math")]
    GeneralMath,
}

impl Subject {
    /// Every supported subject, in prompt order.
    pub const ALL: [Subject; 9] = [
        Subject::Algebra,
        Subject::Geometry,
        Subject::Calculus,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::Statistics,
        Subject::ComputerScience,
        Subject::GeneralMath,
    ];

    /// Subject returned when nothing better is known.
    pub const FALLBACK: Subject = Subject::GeneralMath;

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Algebra => "algebra",
            Subject::Geometry => "geometry",
            Subject::Calculus => "calculus",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Biology => "biology",
            Subject::Statistics => "statistics",
            Subject::ComputerScience => "computer science",
            Subject::GeneralMath => "general math",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Subject> {
        let needle = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|subject| subject.as_str() == needle)
    }

    /// Comma-separated list of all subject names, for prompts.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Subject::parse(s).ok_or_else(|| Error::InvalidInput(format!("Unknown subject: {}", s)))
    }
}

// =============================================================================
// INTERACTIONS
// =============================================================================

/// Kind of AI-assisted work an interaction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Step-by-step solution of a STEM problem
    StemSolution,
    /// Grade-appropriate definition of a term
    TermDefinition,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::StemSolution => "stem_solution",
            InteractionKind::TermDefinition => "term_definition",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stem_solution" => Ok(InteractionKind::StemSolution),
            "term_definition" => Ok(InteractionKind::TermDefinition),
            other => Err(Error::InvalidInput(format!(
                "Unknown interaction kind: {}",
                other
            ))),
        }
    }
}

/// Lifecycle status of an interaction.
///
/// `Pending -> Processing -> {Completed | Failed}`. Terminal states never
/// change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl InteractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionStatus::Pending => "pending",
            InteractionStatus::Processing => "processing",
            InteractionStatus::Completed => "completed",
            InteractionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InteractionStatus::Completed | InteractionStatus::Failed
        )
    }

    /// Whether the state machine permits `self -> next`.
    pub fn can_transition_to(&self, next: InteractionStatus) -> bool {
        matches!(
            (self, next),
            (InteractionStatus::Pending, InteractionStatus::Processing)
                | (InteractionStatus::Processing, InteractionStatus::Completed)
                | (InteractionStatus::Processing, InteractionStatus::Failed)
        )
    }
}

impl fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(InteractionStatus::Pending),
            "processing" => Ok(InteractionStatus::Processing),
            "completed" => Ok(InteractionStatus::Completed),
            "failed" => Ok(InteractionStatus::Failed),
            other => Err(Error::InvalidInput(format!(
                "Unknown interaction status: {}",
                other
            ))),
        }
    }
}

/// Caller-supplied context attached to a request.
///
/// `subject` and `grade_level` are understood by the preprocessors; any
/// other keys are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl RequestContext {
    /// Reject values that cannot be persisted.
    pub fn validate(&self) -> Result<()> {
        if let Some(subject) = &self.subject {
            check_text("context.subject", subject)?;
        }
        if let Some(grade_level) = &self.grade_level {
            check_text("context.grade_level", grade_level)?;
        }
        self.extra
            .iter()
            .try_for_each(|(key, value)| {
                check_text("context", key)?;
                check_json("context", value)
            })
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_grade_level(mut self, grade_level: impl Into<String>) -> Self {
        self.grade_level = Some(grade_level.into());
        self
    }
}

/// Request payload persisted on an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    /// Problem or term text, trimmed.
    pub text: String,
    /// Explicit subject hint.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub context: Option<RequestContext>,
}

impl InteractionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            subject: None,
            context: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Subject hint: the explicit subject, else `context.subject`.
    pub fn subject_hint(&self) -> Option<&str> {
        self.subject
            .as_deref()
            .or_else(|| self.context.as_ref().and_then(|c| c.subject.as_deref()))
    }

    /// Grade level from the context, if given.
    pub fn grade_level(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.grade_level.as_deref())
    }
}

/// Data required to create a new pending interaction.
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub user_id: Uuid,
    pub kind: InteractionKind,
    pub request: JsonValue,
}

/// A logged unit of AI-assisted work tied to one user request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: InteractionKind,
    pub status: InteractionStatus,
    pub request: JsonValue,
    pub response: Option<JsonValue>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Interaction {
    /// Build a fresh pending record.
    pub fn pending(id: Uuid, new: NewInteraction) -> Self {
        Self {
            id,
            user_id: new.user_id,
            kind: new.kind,
            status: InteractionStatus::Pending,
            request: new.request,
            response: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Decode the typed request payload.
    pub fn request_payload(&self) -> Result<InteractionRequest> {
        Ok(serde_json::from_value(self.request.clone())?)
    }

    /// True if the record satisfies the status/payload invariants.
    pub fn is_consistent(&self) -> bool {
        let completed = self.status == InteractionStatus::Completed;
        let failed = self.status == InteractionStatus::Failed;
        self.response.is_some() == completed
            && self.error_message.is_some() == failed
            && self.completed_at.is_some() == self.status.is_terminal()
    }
}

/// Returned by a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub id: Uuid,
    pub status: InteractionStatus,
}

// =============================================================================
// PREPROCESSING RESULTS
// =============================================================================

/// Preprocessed STEM problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemAnalysis {
    pub processed_text: String,
    pub math_expressions: Vec<String>,
    pub subject: Subject,
    pub has_equations: bool,
}

/// Preprocessed vocabulary term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermAnalysis {
    pub processed_term: String,
    pub subject: Subject,
    pub grade_level: String,
    /// Always empty: related-term lookup is not implemented.
    pub related_terms: Vec<String>,
}

// =============================================================================
// PROVIDER TYPES
// =============================================================================

/// Per-call overrides for a raw completion. `None` means "use the
/// configured default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionParams {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system: Option<String>,
}

impl CompletionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Context hints for a definition request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionContext {
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl DefinitionContext {
    pub fn grade_level_or_default(&self) -> &str {
        self.grade_level
            .as_deref()
            .unwrap_or(defaults::GRADE_LEVEL)
    }

    pub fn subject_or_default(&self) -> &str {
        self.subject
            .as_deref()
            .unwrap_or(defaults::DEFINITION_SUBJECT)
    }

    /// Copy with defaults filled in.
    pub fn resolved(&self) -> Self {
        Self {
            grade_level: Some(self.grade_level_or_default().to_string()),
            subject: Some(self.subject_or_default().to_string()),
        }
    }
}

impl From<&TermAnalysis> for DefinitionContext {
    fn from(analysis: &TermAnalysis) -> Self {
        Self {
            grade_level: Some(analysis.grade_level.clone()),
            subject: Some(analysis.subject.as_str().to_string()),
        }
    }
}

/// Markdown solution to a STEM problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemSolution {
    pub solution: String,
    pub subject: String,
}

/// Markdown definition of a term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub definition: String,
    pub term: String,
    pub context: DefinitionContext,
}

/// Provider output tagged by interaction kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiResult {
    StemSolution(StemSolution),
    TermDefinition(TermDefinition),
}

impl AiResult {
    pub fn kind(&self) -> InteractionKind {
        match self {
            AiResult::StemSolution(_) => InteractionKind::StemSolution,
            AiResult::TermDefinition(_) => InteractionKind::TermDefinition,
        }
    }
}

/// Response payload stored on a completed interaction.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionOutput {
    #[serde(flatten)]
    pub result: AiResult,
    /// Model that produced the result.
    pub model: String,
    /// Preprocessing result the prompt was built from.
    pub analysis: JsonValue,
}

// =============================================================================
// API REQUESTS
// =============================================================================

/// NUL and other non-whitespace control characters cannot be stored in a
/// PostgreSQL text or JSONB column.
fn is_forbidden_char(c: char) -> bool {
    c.is_control() && !c.is_whitespace()
}

fn check_text(field: &str, value: &str) -> Result<()> {
    if value.chars().any(is_forbidden_char) {
        return Err(Error::InvalidInput(format!(
            "{} must not contain control characters",
            field
        )));
    }
    Ok(())
}

fn check_json(field: &str, value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::String(s) => check_text(field, s),
        JsonValue::Array(items) => items.iter().try_for_each(|v| check_json(field, v)),
        JsonValue::Object(map) => map.iter().try_for_each(|(k, v)| {
            check_text(field, k)?;
            check_json(field, v)
        }),
        _ => Ok(()),
    }
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    check_text(field, value)?;
    if len > max {
        return Err(Error::InvalidInput(format!(
            "{} must be at most {} characters (got {})",
            field, max, len
        )));
    }
    Ok(())
}

/// Request body for solving a STEM problem.
#[derive(Debug, Clone, Deserialize)]
pub struct SolveProblemRequest {
    pub problem: String,
    pub subject: String,
    #[serde(default)]
    pub context: Option<RequestContext>,
}

impl SolveProblemRequest {
    pub fn validate(&self) -> Result<()> {
        check_length("problem", &self.problem, defaults::PROBLEM_MAX_CHARS)?;
        check_length("subject", &self.subject, defaults::SUBJECT_MAX_CHARS)?;
        self.context.as_ref().map_or(Ok(()), RequestContext::validate)
    }

    pub fn into_payload(self) -> InteractionRequest {
        let mut payload = InteractionRequest::new(self.problem).with_subject(self.subject.trim());
        payload.context = self.context;
        payload
    }
}

/// Request body for defining a term.
#[derive(Debug, Clone, Deserialize)]
pub struct DefineTermRequest {
    pub term: String,
    #[serde(default)]
    pub context: Option<RequestContext>,
}

impl DefineTermRequest {
    pub fn validate(&self) -> Result<()> {
        check_length("term", &self.term, defaults::TERM_MAX_CHARS)?;
        self.context.as_ref().map_or(Ok(()), RequestContext::validate)
    }

    pub fn into_payload(self) -> InteractionRequest {
        let mut payload = InteractionRequest::new(self.term);
        payload.context = self.context;
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_parse_case_insensitive() {
        assert_eq!(Subject::parse("Algebra"), Some(Subject::Algebra));
        assert_eq!(Subject::parse("  PHYSICS "), Some(Subject::Physics));
        assert_eq!(
            Subject::parse("Computer Science"),
            Some(Subject::ComputerScience)
        );
        assert_eq!(Subject::parse("astrology"), None);
        assert_eq!(Subject::parse(""), None);
    }

    #[test]
    fn test_subject_serde_uses_display_names() {
        let json = serde_json::to_string(&Subject::GeneralMath).unwrap();
        assert_eq!(json, "\"general math\"");
        let back: Subject = serde_json::from_str("\"computer science\"").unwrap();
        assert_eq!(back, Subject::ComputerScience);
    }

    #[test]
    fn test_subject_supported_list() {
        let list = Subject::supported_list();
        assert!(list.starts_with("algebra, geometry"));
        assert!(list.ends_with("computer science, general math"));
    }

    #[test]
    fn test_subject_default_is_fallback() {
        assert_eq!(Subject::default(), Subject::FALLBACK);
    }

    #[test]
    fn test_status_transitions() {
        use InteractionStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Processing));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            InteractionStatus::Pending,
            InteractionStatus::Processing,
            InteractionStatus::Completed,
            InteractionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<InteractionStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<InteractionStatus>().is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "stem_solution".parse::<InteractionKind>().unwrap(),
            InteractionKind::StemSolution
        );
        assert!("essay".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn test_request_context_keeps_extra_keys() {
        let ctx: RequestContext = serde_json::from_value(json!({
            "subject": "physics",
            "grade_level": "college",
            "course": "PHYS 101"
        }))
        .unwrap();
        assert_eq!(ctx.subject.as_deref(), Some("physics"));
        assert_eq!(ctx.grade_level.as_deref(), Some("college"));
        assert_eq!(ctx.extra.get("course"), Some(&json!("PHYS 101")));

        let back = serde_json::to_value(&ctx).unwrap();
        assert_eq!(back["course"], "PHYS 101");
    }

    #[test]
    fn test_subject_hint_prefers_explicit_subject() {
        let req = InteractionRequest::new("x + 1 = 2")
            .with_subject("algebra")
            .with_context(RequestContext::default().with_subject("physics"));
        assert_eq!(req.subject_hint(), Some("algebra"));

        let req = InteractionRequest::new("force")
            .with_context(RequestContext::default().with_subject("physics"));
        assert_eq!(req.subject_hint(), Some("physics"));

        assert_eq!(InteractionRequest::new("force").subject_hint(), None);
    }

    #[test]
    fn test_interaction_request_trims_text() {
        let req = InteractionRequest::new("  photosynthesis \n");
        assert_eq!(req.text, "photosynthesis");
    }

    #[test]
    fn test_pending_interaction_is_consistent() {
        let interaction = Interaction::pending(
            Uuid::now_v7(),
            NewInteraction {
                user_id: Uuid::new_v4(),
                kind: InteractionKind::TermDefinition,
                request: json!({"text": "osmosis"}),
            },
        );
        assert_eq!(interaction.status, InteractionStatus::Pending);
        assert!(interaction.is_consistent());
        assert_eq!(interaction.request_payload().unwrap().text, "osmosis");
    }

    #[test]
    fn test_inconsistent_interaction_detected() {
        let mut interaction = Interaction::pending(
            Uuid::now_v7(),
            NewInteraction {
                user_id: Uuid::new_v4(),
                kind: InteractionKind::StemSolution,
                request: json!({"text": "1 + 1"}),
            },
        );
        interaction.status = InteractionStatus::Completed;
        assert!(!interaction.is_consistent());
        interaction.response = Some(json!({}));
        interaction.completed_at = Some(Utc::now());
        assert!(interaction.is_consistent());
    }

    #[test]
    fn test_definition_context_defaults() {
        let ctx = DefinitionContext::default();
        assert_eq!(ctx.grade_level_or_default(), "high school");
        assert_eq!(ctx.subject_or_default(), "general");
        let resolved = ctx.resolved();
        assert_eq!(resolved.grade_level.as_deref(), Some("high school"));
        assert_eq!(resolved.subject.as_deref(), Some("general"));
    }

    #[test]
    fn test_ai_result_is_tagged() {
        let result = AiResult::StemSolution(StemSolution {
            solution: "## Answer\n4".to_string(),
            subject: "algebra".to_string(),
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "stem_solution");
        assert_eq!(value["subject"], "algebra");
        assert_eq!(result.kind(), InteractionKind::StemSolution);
    }

    #[test]
    fn test_interaction_output_flattens_result() {
        let output = InteractionOutput {
            result: AiResult::TermDefinition(TermDefinition {
                definition: "A process...".to_string(),
                term: "osmosis".to_string(),
                context: DefinitionContext::default().resolved(),
            }),
            model: "claude-3-sonnet-20240229".to_string(),
            analysis: json!({"processed_term": "osmosis"}),
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["type"], "term_definition");
        assert_eq!(value["term"], "osmosis");
        assert_eq!(value["context"]["grade_level"], "high school");
        assert_eq!(value["analysis"]["processed_term"], "osmosis");
    }

    #[test]
    fn test_solve_request_validation() {
        let ok = SolveProblemRequest {
            problem: "2x = 4".to_string(),
            subject: "algebra".to_string(),
            context: None,
        };
        assert!(ok.validate().is_ok());

        let empty = SolveProblemRequest {
            problem: "   ".to_string(),
            subject: "algebra".to_string(),
            context: None,
        };
        assert!(matches!(empty.validate(), Err(Error::InvalidInput(_))));

        let long = SolveProblemRequest {
            problem: "x".repeat(2001),
            subject: "algebra".to_string(),
            context: None,
        };
        assert!(long.validate().is_err());

        let long_subject = SolveProblemRequest {
            problem: "1 + 1".to_string(),
            subject: "s".repeat(51),
            context: None,
        };
        assert!(long_subject.validate().is_err());
    }

    #[test]
    fn test_define_request_validation() {
        let ok = DefineTermRequest {
            term: "mitochondria".to_string(),
            context: None,
        };
        assert!(ok.validate().is_ok());

        let long = DefineTermRequest {
            term: "t".repeat(101),
            context: None,
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_control_characters_rejected() {
        let nul = SolveProblemRequest {
            problem: "2x\u{0} = 4".to_string(),
            subject: "algebra".to_string(),
            context: None,
        };
        let err = nul.validate().unwrap_err();
        assert!(err.to_string().contains("problem must not contain control characters"));

        let bell = DefineTermRequest {
            term: "osmosis\u{7}".to_string(),
            context: None,
        };
        assert!(matches!(bell.validate(), Err(Error::InvalidInput(_))));

        // ordinary whitespace is fine
        let multiline = SolveProblemRequest {
            problem: "Given:\n\tx + 1 = 3\r\nFind x".to_string(),
            subject: "algebra".to_string(),
            context: None,
        };
        assert!(multiline.validate().is_ok());
    }

    #[test]
    fn test_control_characters_in_context_rejected() {
        let grade = DefineTermRequest {
            term: "osmosis".to_string(),
            context: Some(RequestContext::default().with_grade_level("grade\u{0}9")),
        };
        assert!(grade.validate().is_err());

        let mut nested = RequestContext::default();
        nested
            .extra
            .insert("notes".to_string(), json!({"items": ["ok", "bad\u{0}"]}));
        let req = DefineTermRequest {
            term: "osmosis".to_string(),
            context: Some(nested),
        };
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("context must not contain control characters"));

        let mut clean = RequestContext::default().with_subject("biology");
        clean.extra.insert("unit".to_string(), json!(["cells", 3]));
        let req = DefineTermRequest {
            term: "osmosis".to_string(),
            context: Some(clean),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_solve_request_into_payload() {
        let req = SolveProblemRequest {
            problem: "  solve 2x = 4 ".to_string(),
            subject: " Algebra ".to_string(),
            context: Some(RequestContext::default().with_grade_level("middle school")),
        };
        let payload = req.into_payload();
        assert_eq!(payload.text, "solve 2x = 4");
        assert_eq!(payload.subject.as_deref(), Some("Algebra"));
        assert_eq!(payload.grade_level(), Some("middle school"));
    }
}
