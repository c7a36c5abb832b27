//! Retrieved passage with its similarity score and provenance

use serde::{Deserialize, Serialize};

/// A retrieved chunk of a source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub text: String,
    pub source_document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_name: Option<String>,
    pub chunk_index: usize,
    /// Similarity in the retrieval metric's native range
    pub score: f64,
    /// Relevance assigned by a scoring reranker; `score` is left as retrieved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ScoredPassage {
    pub fn new(
        text: impl Into<String>,
        document_id: impl Into<String>,
        chunk_index: usize,
        score: f64,
    ) -> Self {
        Self {
            text: text.into(),
            source_document_id: document_id.into(),
            source_document_name: None,
            chunk_index,
            score,
            rerank_score: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.source_document_name = Some(name.into());
        self
    }

    /// Document name when known and non-empty, else the document id
    pub fn display_name(&self) -> &str {
        match self.source_document_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.source_document_id,
        }
    }

    /// Citation tag in `[name_or_id:document_id:chunk_index]` form
    pub fn citation(&self) -> String {
        format!(
            "[{}:{}:{}]",
            self.display_name(),
            self.source_document_id,
            self.chunk_index
        )
    }
}

/// (min, max) of the passages' scores, `None` when empty
pub fn score_range(passages: &[ScoredPassage]) -> Option<(f64, f64)> {
    passages.iter().map(|p| p.score).fold(None, |acc, s| match acc {
        None => Some((s, s)),
        Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
    })
}
