//! HTTP client for a Chunkenizer-style document search service
//!
//! Sends `POST {base_url}/search` and converts the hits into passages.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::Retriever;
use crate::errors::RetrievalError;
use crate::types::ScoredPassage;

/// Default search service address
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:8000";

/// One hit from the search service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub chunk_text: String,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default)]
    pub chunk_index: usize,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Body returned by `/search`
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl From<SearchHit> for ScoredPassage {
    fn from(hit: SearchHit) -> Self {
        Self {
            text: hit.chunk_text,
            source_document_id: hit.document_id,
            source_document_name: hit.document_name.filter(|name| !name.is_empty()),
            chunk_index: hit.chunk_index,
            score: hit.score,
            rerank_score: None,
            metadata: hit.metadata,
        }
    }
}

/// HTTP search client
pub struct ChunkenizerClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ChunkenizerClient {
    /// Create a new search client
    ///
    /// # Arguments
    /// * `base_url` - Service root (default: http://localhost:8000)
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, err: reqwest::Error) -> RetrievalError {
        if err.is_timeout() {
            RetrievalError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }
        } else {
            RetrievalError::Unavailable(format!("Failed to connect to search service: {}", err))
        }
    }
}

#[async_trait]
impl Retriever for ChunkenizerClient {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        if query.trim().is_empty() {
            warn!("empty query provided to search, skipping request");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "query": query, "top_k": top_k, "filters": {} }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(RetrievalError::Unavailable(format!(
                "Search API error: {} {}",
                status, snippet
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let mut passages: Vec<ScoredPassage> =
            parsed.results.into_iter().map(ScoredPassage::from).collect();
        // Downstream stages rely on descending order; keep ties in service order
        passages.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        info!(
            query_len = query.len(),
            top_k,
            results = passages.len(),
            time_ms = started.elapsed().as_millis() as u64,
            "search completed"
        );

        Ok(passages)
    }
}
