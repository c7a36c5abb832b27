//! Error types for citerag
//!
//! Collaborator failures are split from pipeline failures: retrieval errors
//! are always recovered inside the pipeline, generation errors are fatal in
//! single mode and per-branch in compare mode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a retrieval collaborator
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Search backend unreachable or returned a non-success status
    #[error("Retrieval unavailable: {0}")]
    Unavailable(String),

    /// Search backend did not answer in time
    #[error("Retrieval timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Search backend answered with a body we could not read
    #[error("Invalid retrieval response: {0}")]
    InvalidResponse(String),
}

/// Failure reported by a generation collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Client is missing credentials or endpoint settings
    #[error("Generation not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Upstream model API rejected the request
    #[error("Upstream API error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Upstream answered with a body we could not read
    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),

    /// Upstream did not answer in time
    #[error("Generation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Main error type for pipeline runs
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No user message to attach context to
    #[error("No user message found in the conversation")]
    NoUserMessage,

    /// Single-mode generation failed
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Both compare-mode branches failed
    #[error("Both comparison branches failed (baseline: {baseline}; enhanced: {enhanced})")]
    AllBranchesFailed {
        baseline: GenerationError,
        enhanced: GenerationError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Structured error object handed to callers instead of a raw error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
}

impl PipelineError {
    /// Stable machine-readable name for this error
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NoUserMessage => "no_user_message",
            PipelineError::Generation(_) => "generation_failure",
            PipelineError::AllBranchesFailed { .. } => "all_branches_failed",
            PipelineError::Config(_) => "config_error",
        }
    }

    /// Convert into the structured payload shown to callers
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind().to_string(),
            detail: self.to_string(),
        }
    }
}

impl GenerationError {
    /// Stable machine-readable name for this error
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::NotConfigured(_) => "generation_not_configured",
            GenerationError::Http(_) => "generation_http_error",
            GenerationError::Upstream { .. } => "generation_upstream_error",
            GenerationError::InvalidResponse(_) => "generation_invalid_response",
            GenerationError::Timeout { .. } => "generation_timeout",
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind().to_string(),
            detail: self.to_string(),
        }
    }
}

impl From<PipelineError> for ErrorPayload {
    fn from(err: PipelineError) -> Self {
        err.to_payload()
    }
}
