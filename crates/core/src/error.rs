//! Error types for the Apoyo domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! An empty retrieval result is deliberately NOT an error anywhere in this
//! taxonomy: zero retrieved strategies is a valid state that drives the
//! fallback path.

use thiserror::Error;

/// The top-level error type for all Apoyo operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of one generation pipeline run.
///
/// All of these abort the run for that request; none are retried
/// internally. Retry-on-transient-failure belongs to the job runner.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Model output contained no JSON object. Raw (first 600 chars): {preview}")]
    NoJsonFound { preview: String },

    #[error("Model output JSON was malformed: {detail}. Raw (first 600 chars): {preview}")]
    MalformedJson { detail: String, preview: String },

    #[error("Generated output failed schema validation: {detail}")]
    SchemaViolation { detail: String },

    #[error("Guardrails failed. Banned terms found: {terms:?}")]
    GuardrailViolation { terms: Vec<String> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// Failures of the generation backend (LLM transport/provider).
///
/// Propagated unchanged through the pipeline — interpretation and retry
/// policy live with the caller.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unrecognized response shape: {0}")]
    UnrecognizedShape(String),
}

/// Failures of the vector-index retrieval adapter.
///
/// Zero results is not represented here — the adapter returns an empty
/// list for that.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Index query failed: {0}")]
    QueryFailed(String),

    #[error("Index unreachable: {0}")]
    Unreachable(String),

    #[error("Unrecognized result shape: {0}")]
    UnrecognizedShape(String),
}
