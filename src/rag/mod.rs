// Retrieval-augmented context pipeline
//
// Turns ranked passages into a citation-tagged context block and splices it
// into the conversation before generation.
//
// Components:
// - Filter: similarity threshold with a minimum-count fallback
// - Re-ranking: pluggable passage ordering
// - Context: citation-annotated block under a character budget
// - Inject: grounding instruction plus context on the last user message
// - Pipeline: single and comparison mode orchestration

pub mod retrieval;
pub mod filter;
pub mod reranking;
pub mod context;
pub mod inject;
pub mod pipeline;

// Re-export key types
pub use context::{ContextAssembler, ContextBlock};
pub use filter::{FilterResult, SimilarityFilter};
pub use inject::inject_context;
pub use pipeline::{
    BranchResult, ContextPipeline, PipelineConfig, PipelineOutcome, PipelineResult, PreparedBranch,
};
pub use reranking::{NoOpReranker, Reranker, RerankerRegistry};
pub use retrieval::{ChunkenizerClient, Retriever};
