//! citerag - Retrieval-augmented context pipeline
//!
//! Filters, reranks and assembles retrieved passages into a citation-tagged
//! context block, injects it into a chat conversation and generates an
//! answer, optionally next to an unfiltered baseline for comparison.
//!
//! # Architecture
//!
//! - **types**: passages and chat messages
//! - **rag**: filter, reranking, context assembly, injection, orchestration
//! - **generation**: model collaborator and its HTTP client
//! - **telemetry**: per-branch observability records

pub mod errors;
pub mod types;
pub mod rag;
pub mod generation;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{ErrorPayload, GenerationError, PipelineError, Result, RetrievalError};
pub use types::{ChatMessage, Role, ScoredPassage};

// Ambient layer: settings, logging, command line
pub mod config;
pub mod logging;
pub mod cli;
