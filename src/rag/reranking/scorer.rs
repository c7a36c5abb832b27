// Lexical reranker: similarity blended with query keyword overlap
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use super::Reranker;
use crate::types::ScoredPassage;

/// Lexical reranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalConfig {
    /// Weight of the retrieval score (0.0 to 1.0)
    pub similarity_weight: f64,
    /// Maximum boost for query keywords found in the passage
    pub keyword_boost: f64,
    /// Query words shorter than this are ignored
    pub min_keyword_len: usize,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 1.0,
            keyword_boost: 0.1,
            min_keyword_len: 4,
        }
    }
}

/// Reranks by `score * similarity_weight + keyword boost`
#[derive(Debug, Clone, Default)]
pub struct LexicalReranker {
    config: LexicalConfig,
}

impl LexicalReranker {
    pub fn with_config(config: LexicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LexicalConfig {
        &self.config
    }

    fn compute_score(&self, passage: &ScoredPassage, keywords: &[String]) -> f64 {
        passage.score * self.config.similarity_weight + self.keyword_boost(passage, keywords)
    }

    /// Boost proportional to the share of query keywords present in the passage
    fn keyword_boost(&self, passage: &ScoredPassage, keywords: &[String]) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }

        let content = passage.text.to_lowercase();
        let matches = keywords.iter().filter(|word| content.contains(word.as_str())).count();

        self.config.keyword_boost * matches as f64 / keywords.len() as f64
    }

    fn keywords(&self, query: &str) -> Vec<String> {
        let mut words: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= self.config.min_keyword_len)
            .map(str::to_string)
            .collect();
        words.sort();
        words.dedup();
        words
    }
}

#[async_trait]
impl Reranker for LexicalReranker {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn rerank(&self, query: &str, passages: Vec<ScoredPassage>) -> Vec<ScoredPassage> {
        let keywords = self.keywords(query);

        let mut ranked: Vec<ScoredPassage> = passages
            .into_iter()
            .map(|mut passage| {
                passage.rerank_score = Some(self.compute_score(&passage, &keywords));
                passage
            })
            .collect();

        // Stable: equal rerank scores keep retrieval order
        ranked.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(Ordering::Equal)
        });

        debug!(chunks = ranked.len(), keywords = keywords.len(), "lexical rerank applied");
        ranked
    }
}
