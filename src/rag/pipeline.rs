// End-to-end context pipeline: retrieve, filter, rerank, assemble, inject, generate
use chrono::{DateTime, Utc};
use futures_util::future::join;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::{ErrorPayload, GenerationError, PipelineError, Result};
use crate::generation::{Completion, Generator};
use crate::rag::context::{ContextAssembler, ContextBlock};
use crate::rag::filter::SimilarityFilter;
use crate::rag::inject::inject_context;
use crate::rag::reranking::{RerankerRegistry, NOOP_RERANKER};
use crate::rag::retrieval::Retriever;
use crate::telemetry::Observability;
use crate::types::messages::{last_user_index, ChatMessage};
use crate::types::ScoredPassage;

/// Per-request pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Similarity threshold; 0.0 disables filtering
    pub min_similarity: f64,
    /// Fewest passages the filter may leave
    pub min_chunks: usize,
    pub reranker_enabled: bool,
    /// Registry key of the reranker to use
    pub reranker_type: String,
    /// Produce a baseline and an enhanced answer
    pub compare_mode: bool,
    /// Character budget for the context block
    pub max_context_chars: usize,
    /// Passages requested from retrieval
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.0,
            min_chunks: 2,
            reranker_enabled: false,
            reranker_type: NOOP_RERANKER.to_string(),
            compare_mode: false,
            max_context_chars: 8000,
            top_k: 5,
        }
    }
}

impl PipelineConfig {
    /// Reject settings no request could run with
    pub fn validate(&self) -> Result<()> {
        if !self.min_similarity.is_finite() {
            return Err(PipelineError::Config(format!(
                "min_similarity must be a finite number, got {}",
                self.min_similarity
            )));
        }
        if self.max_context_chars == 0 {
            return Err(PipelineError::Config(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::Config("top_k must be greater than zero".to_string()));
        }
        if self.reranker_type.trim().is_empty() {
            return Err(PipelineError::Config("reranker_type must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Stage output for one branch, ready to be sent to the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedBranch {
    pub messages: Vec<ChatMessage>,
    pub context: ContextBlock,
    pub metadata: Observability,
}

/// One compare-mode branch after generation; exactly one of `completion` and `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchResult {
    pub answer: Option<String>,
    pub completion: Option<Completion>,
    pub error: Option<ErrorPayload>,
    pub metadata: Observability,
    pub messages: Vec<ChatMessage>,
}

impl BranchResult {
    fn from_outcome(
        prepared: PreparedBranch,
        outcome: std::result::Result<Completion, GenerationError>,
    ) -> Self {
        let (completion, error) = match outcome {
            Ok(completion) => (Some(completion), None),
            Err(err) => (None, Some(err.to_payload())),
        };
        Self {
            answer: completion.as_ref().map(|c| c.content.clone()),
            completion,
            error,
            metadata: prepared.metadata,
            messages: prepared.messages,
        }
    }

    pub fn is_success(&self) -> bool {
        self.completion.is_some()
    }
}

/// Answer(s) produced by a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Single {
        completion: Completion,
        metadata: Observability,
        messages: Vec<ChatMessage>,
    },
    Compare {
        baseline: BranchResult,
        enhanced: BranchResult,
    },
}

/// Pipeline result with request bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub query: String,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

/// Context pipeline bound to its collaborators.
///
/// Holds no per-request state: every call to [`ContextPipeline::run`] takes
/// its own config, and dropping the returned future cancels any generation
/// still in flight.
pub struct ContextPipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    rerankers: RerankerRegistry,
}

impl ContextPipeline {
    /// Create a pipeline with the default reranker registry
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self::with_rerankers(retriever, generator, RerankerRegistry::default())
    }

    /// Create a pipeline with a custom reranker registry
    pub fn with_rerankers(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        rerankers: RerankerRegistry,
    ) -> Self {
        Self {
            retriever,
            generator,
            rerankers,
        }
    }

    pub fn rerankers(&self) -> &RerankerRegistry {
        &self.rerankers
    }

    /// Run the pipeline for one chat request
    pub async fn run(
        &self,
        query: &str,
        messages: &[ChatMessage],
        config: &PipelineConfig,
    ) -> Result<PipelineResult> {
        config.validate()?;
        if last_user_index(messages).is_none() {
            return Err(PipelineError::NoUserMessage);
        }

        let request_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("context_pipeline", %request_id, compare = config.compare_mode);

        async move {
            let passages = self.retrieve(query, config.top_k).await;

            let outcome = if config.compare_mode {
                self.run_compare(query, messages, &passages, config).await?
            } else {
                self.run_single(query, messages, &passages, config).await?
            };

            Ok::<_, PipelineError>(PipelineResult {
                request_id,
                started_at,
                query: query.to_string(),
                outcome,
            })
        }
        .instrument(span)
        .await
    }

    /// Retrieve passages, degrading to none when the collaborator fails.
    ///
    /// Passages with blank text are dropped so no citation reaches the
    /// prompt without evidence behind it.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<ScoredPassage> {
        let passages = match self.retriever.search(query, top_k).await {
            Ok(passages) => passages,
            Err(err) => {
                warn!(error = %err, "retrieval unavailable, continuing without context");
                return Vec::new();
            }
        };

        let returned = passages.len();
        let passages: Vec<ScoredPassage> = passages
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .collect();
        if passages.len() < returned {
            debug!(dropped = returned - passages.len(), "skipped blank passages");
        }
        passages
    }

    /// Filter, rerank, assemble and inject
    pub async fn prepare_enhanced(
        &self,
        query: &str,
        messages: &[ChatMessage],
        passages: &[ScoredPassage],
        config: &PipelineConfig,
    ) -> Result<PreparedBranch> {
        let filtered = SimilarityFilter::new(config.min_similarity, config.min_chunks).filter(passages);

        let (ranked, reranker_type) = if config.reranker_enabled {
            let reranker = self.rerankers.resolve(&config.reranker_type);
            let ranked = reranker.rerank(query, filtered.surviving.clone()).await;
            if ranked.len() != filtered.surviving_count {
                warn!(
                    reranker = reranker.name(),
                    before = filtered.surviving_count,
                    after = ranked.len(),
                    "reranker changed the passage count"
                );
            }
            (ranked, Some(reranker.name().to_string()))
        } else {
            (filtered.surviving.clone(), None)
        };

        let context = ContextAssembler::new(config.max_context_chars).assemble(&ranked);
        let messages = inject_context(messages, &context)?;
        let metadata = Observability::enhanced(&filtered, reranker_type.as_deref(), &context);
        metadata.log("enhanced");

        Ok(PreparedBranch {
            messages,
            context,
            metadata,
        })
    }

    /// Assemble every retrieved passage without filtering or reranking
    pub fn prepare_baseline(
        &self,
        messages: &[ChatMessage],
        passages: &[ScoredPassage],
        config: &PipelineConfig,
    ) -> Result<PreparedBranch> {
        let context = ContextAssembler::new(config.max_context_chars).assemble(passages);
        let messages = inject_context(messages, &context)?;
        let metadata = Observability::baseline(passages, &context);
        metadata.log("baseline");

        Ok(PreparedBranch {
            messages,
            context,
            metadata,
        })
    }

    async fn run_single(
        &self,
        query: &str,
        messages: &[ChatMessage],
        passages: &[ScoredPassage],
        config: &PipelineConfig,
    ) -> Result<PipelineOutcome> {
        let prepared = self.prepare_enhanced(query, messages, passages, config).await?;
        let completion = self.generator.generate(&prepared.messages).await?;

        info!(latency_ms = completion.latency_ms, model = %completion.model, "answer generated");

        Ok(PipelineOutcome::Single {
            completion,
            metadata: prepared.metadata,
            messages: prepared.messages,
        })
    }

    async fn run_compare(
        &self,
        query: &str,
        messages: &[ChatMessage],
        passages: &[ScoredPassage],
        config: &PipelineConfig,
    ) -> Result<PipelineOutcome> {
        let baseline = self.prepare_baseline(messages, passages, config)?;
        let enhanced = self.prepare_enhanced(query, messages, passages, config).await?;

        // Independent calls; neither waits on the other
        let (baseline_outcome, enhanced_outcome) = join(
            self.generator.generate(&baseline.messages),
            self.generator.generate(&enhanced.messages),
        )
        .await;

        match (&baseline_outcome, &enhanced_outcome) {
            (Err(b), Err(e)) => {
                return Err(PipelineError::AllBranchesFailed {
                    baseline: b.clone(),
                    enhanced: e.clone(),
                });
            }
            (Err(err), Ok(_)) => warn!(branch = "baseline", error = %err, "branch generation failed"),
            (Ok(_), Err(err)) => warn!(branch = "enhanced", error = %err, "branch generation failed"),
            (Ok(_), Ok(_)) => info!("both comparison branches answered"),
        }

        Ok(PipelineOutcome::Compare {
            baseline: BranchResult::from_outcome(baseline, baseline_outcome),
            enhanced: BranchResult::from_outcome(enhanced, enhanced_outcome),
        })
    }
}
