//! Observability for pipeline runs
//!
//! One `Observability` record per branch, serialised alongside the answer
//! and emitted as a structured log event.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rag::context::ContextBlock;
use crate::rag::filter::FilterResult;
use crate::types::passage::{score_range, ScoredPassage};

/// Reported reranker type when reranking is switched off
pub const RERANKER_DISABLED: &str = "none";

/// Per-branch record of what each stage did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observability {
    /// Passages returned by retrieval
    pub initial_chunks: usize,
    /// Passages left after the similarity filter
    pub filtered_chunks: usize,
    /// Passages that made it into the context block
    pub final_chunks: usize,
    pub threshold: f64,
    pub fallback_triggered: bool,
    pub reranker_enabled: bool,
    pub reranker_type: String,
    pub scores_range: Option<(f64, f64)>,
    /// Context block length in characters
    pub context_size: usize,
    pub truncated: bool,
}

impl Observability {
    /// Record for the full filter, rerank and assemble path
    pub fn enhanced(
        filter: &FilterResult,
        reranker_type: Option<&str>,
        context: &ContextBlock,
    ) -> Self {
        Self {
            initial_chunks: filter.original_count,
            filtered_chunks: filter.surviving_count,
            final_chunks: context.passages_included.len(),
            threshold: filter.threshold_used,
            fallback_triggered: filter.fallback_triggered,
            reranker_enabled: reranker_type.is_some(),
            reranker_type: reranker_type.unwrap_or(RERANKER_DISABLED).to_string(),
            scores_range: filter.score_range,
            context_size: context.char_count,
            truncated: context.truncated,
        }
    }

    /// Record for the unfiltered baseline path
    pub fn baseline(passages: &[ScoredPassage], context: &ContextBlock) -> Self {
        Self {
            initial_chunks: passages.len(),
            filtered_chunks: passages.len(),
            final_chunks: context.passages_included.len(),
            threshold: 0.0,
            fallback_triggered: false,
            reranker_enabled: false,
            reranker_type: RERANKER_DISABLED.to_string(),
            scores_range: score_range(passages),
            context_size: context.char_count,
            truncated: context.truncated,
        }
    }

    /// Emit this record as a structured log event
    pub fn log(&self, branch: &str) {
        let (min_score, max_score) = self.scores_range.unwrap_or((0.0, 0.0));
        info!(
            branch,
            initial_chunks = self.initial_chunks,
            filtered_chunks = self.filtered_chunks,
            final_chunks = self.final_chunks,
            threshold = self.threshold,
            fallback_triggered = self.fallback_triggered,
            reranker_enabled = self.reranker_enabled,
            reranker_type = %self.reranker_type,
            min_score,
            max_score,
            context_size = self.context_size,
            truncated = self.truncated,
            "context pipeline stages complete"
        );
    }
}
