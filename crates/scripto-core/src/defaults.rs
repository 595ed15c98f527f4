//! Centralized default constants for the ScriptO AI pipeline.
//!
//! Every crate reads shared defaults from here instead of defining its own
//! magic numbers. Organized by domain area.

// =============================================================================
// AI PROVIDER
// =============================================================================

/// Anthropic Messages API base URL.
pub const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Primary generation model.
pub const AI_MODEL: &str = "claude-3-sonnet-20240229";

/// Model tried once when the primary model is overloaded or erroring.
pub const AI_FALLBACK_MODEL: &str = "claude-3-haiku-20240307";

/// Maximum output tokens per completion.
pub const AI_MAX_TOKENS: u32 = 1500;

/// Temperature for open-ended completions.
pub const AI_DEFAULT_TEMPERATURE: f32 = 0.7;

/// Temperature for STEM solutions.
pub const AI_STEM_TEMPERATURE: f32 = 0.3;

/// Temperature for term definitions.
pub const AI_DEFINITION_TEMPERATURE: f32 = 0.3;

/// Temperature for subject classification.
pub const AI_CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Upstream request timeout in seconds.
pub const AI_TIMEOUT_SECS: u64 = 30;

/// Timeout for provider health checks in seconds.
pub const AI_HEALTH_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// PREPROCESSING
// =============================================================================

/// Grade level assumed when the caller does not give one.
pub const GRADE_LEVEL: &str = "high school";

/// Subject label used in definition prompts when none is known.
pub const DEFINITION_SUBJECT: &str = "general";

// =============================================================================
// REQUEST VALIDATION
// =============================================================================

/// Maximum characters in a STEM problem.
pub const PROBLEM_MAX_CHARS: usize = 2000;

/// Maximum characters in a subject hint.
pub const SUBJECT_MAX_CHARS: usize = 50;

/// Maximum characters in a term.
pub const TERM_MAX_CHARS: usize = 100;

// =============================================================================
// DATABASE
// =============================================================================

/// Connections opened by the interaction log pool at most.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Idle connections kept open.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Wait for a free connection before failing, in seconds.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Close connections idle for longer than this, in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// BACKGROUND PROCESSING
// =============================================================================

/// Capacity of the bounded interaction queue.
pub const QUEUE_CAPACITY: usize = 256;

/// Interactions processed concurrently by one worker.
pub const WORKER_MAX_CONCURRENT: usize = 4;

/// Deadline for processing one interaction end to end, in seconds.
///
/// Covers classification plus a primary and a fallback provider call.
pub const INTERACTION_TIMEOUT_SECS: u64 = 3 * AI_TIMEOUT_SECS;

/// Most stale `processing` records failed by one startup recovery pass.
pub const RECOVERY_BATCH_MAX: i64 = 1000;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// API / SERVER
// =============================================================================

/// Default HTTP listen port.
pub const SERVER_PORT: u16 = 3000;

/// Requests per rate-limit period (30/min for AI endpoints).
pub const RATE_LIMIT_REQUESTS: u64 = 30;

/// Rate-limit period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Interval for dropping idle per-user rate-limit buckets, in seconds.
pub const RATE_LIMIT_PRUNE_SECS: u64 = 300;

/// Deadline for the database ping in `/health`, in seconds.
pub const DB_HEALTH_TIMEOUT_SECS: u64 = 5;

/// CORS preflight cache lifetime in seconds.
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Default page size for interaction history.
pub const PAGE_LIMIT: i64 = 20;

/// Maximum page size for interaction history.
pub const PAGE_LIMIT_MAX: i64 = 100;

/// Maximum request body size accepted by the API.
pub const MAX_BODY_SIZE_BYTES: usize = 64 * 1024;
