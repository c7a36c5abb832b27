// Retrieval collaborator boundary
pub mod client;

use async_trait::async_trait;

use crate::errors::RetrievalError;
use crate::types::ScoredPassage;

pub use client::{ChunkenizerClient, SearchHit, SearchResponse};

/// Source of scored passages for a query
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top_k` passages, sorted by score descending
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredPassage>, RetrievalError>;
}
