// Passage reranking: capability trait, default passthrough, and a name-keyed registry
//
// A reranker reorders passages and may attach `rerank_score`. It never adds
// or removes passages; dropping low-relevance text is the filter's job.

pub mod scorer;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::ScoredPassage;

pub use scorer::{LexicalConfig, LexicalReranker};

/// Name of the passthrough reranker, used when nothing else is requested
pub const NOOP_RERANKER: &str = "noop";

/// Reorders passages by relevance to a query
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Registry key (e.g. "noop", "lexical")
    fn name(&self) -> &str;

    /// Return the same passages, possibly reordered
    async fn rerank(&self, query: &str, passages: Vec<ScoredPassage>) -> Vec<ScoredPassage>;
}

/// Passthrough reranker: keeps retrieval order
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    fn name(&self) -> &str {
        NOOP_RERANKER
    }

    async fn rerank(&self, _query: &str, passages: Vec<ScoredPassage>) -> Vec<ScoredPassage> {
        debug!(chunks = passages.len(), "noop reranker preserving original order");
        passages
    }
}

/// Rerankers keyed by their configured type name
#[derive(Clone)]
pub struct RerankerRegistry {
    rerankers: BTreeMap<String, Arc<dyn Reranker>>,
}

impl RerankerRegistry {
    /// Registry holding only the passthrough reranker
    pub fn new() -> Self {
        let mut registry = Self {
            rerankers: BTreeMap::new(),
        };
        registry.register(NoOpReranker);
        registry
    }

    /// Add or replace a reranker under its own name
    pub fn register<R: Reranker + 'static>(&mut self, reranker: R) {
        self.rerankers
            .insert(reranker.name().to_string(), Arc::new(reranker));
    }

    /// Look up a reranker, falling back to the passthrough for unknown names
    pub fn resolve(&self, reranker_type: &str) -> Arc<dyn Reranker> {
        if let Some(reranker) = self.rerankers.get(reranker_type) {
            return Arc::clone(reranker);
        }

        warn!(
            reranker_type,
            fallback = NOOP_RERANKER,
            "unknown reranker type, falling back"
        );
        match self.rerankers.get(NOOP_RERANKER) {
            Some(noop) => Arc::clone(noop),
            None => Arc::new(NoOpReranker),
        }
    }

    pub fn contains(&self, reranker_type: &str) -> bool {
        self.rerankers.contains_key(reranker_type)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.rerankers.keys().map(String::as_str).collect()
    }
}

impl Default for RerankerRegistry {
    /// Passthrough plus the lexical reranker
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(LexicalReranker::default());
        registry
    }
}
