//! Integration tests for the context pipeline
//!
//! Runs the full retrieve -> generate flow against in-process collaborators.

mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

use citerag::generation::{Completion, Generator};
use citerag::rag::{ContextPipeline, PipelineConfig, PipelineOutcome};
use citerag::{ChatMessage, GenerationError, PipelineError};
use common::{scored_passages, shared, FailingRetriever, FixedRetriever, RecordingGenerator};

fn conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("What is in the documents?"),
    ]
}

#[tokio::test]
async fn test_single_mode_filters_and_cites() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.8, 0.7, 0.3, 0.1])));
    let generator = shared(RecordingGenerator::succeeding());
    let pipeline = ContextPipeline::new(retriever.clone(), generator.clone());

    let config = PipelineConfig {
        min_similarity: 0.5,
        ..Default::default()
    };
    let result = pipeline
        .run("What is in the documents?", &conversation(), &config)
        .await
        .unwrap();

    let PipelineOutcome::Single {
        completion,
        metadata,
        messages,
    } = result.outcome
    else {
        panic!("expected single-mode outcome");
    };

    assert!(completion.content.starts_with("answer from"));
    assert_eq!(metadata.initial_chunks, 5);
    assert_eq!(metadata.filtered_chunks, 3);
    assert_eq!(metadata.final_chunks, 3);
    assert!(!metadata.fallback_triggered);
    assert_eq!(metadata.reranker_type, "none");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "You are a helpful assistant.");
    let prompt = &messages[1].content;
    assert!(prompt.contains("[doc0:doc0:0]"));
    assert!(prompt.contains("[doc2:doc2:2]"));
    assert!(!prompt.contains("[doc3:doc3:3]"));
    assert!(prompt.ends_with("Question: What is in the documents?"));

    assert_eq!(generator.prompts().len(), 1);
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_strict_threshold_falls_back_to_top_two() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.8, 0.7, 0.3, 0.1])));
    let pipeline = ContextPipeline::new(retriever, shared(RecordingGenerator::succeeding()));

    let config = PipelineConfig {
        min_similarity: 0.95,
        min_chunks: 2,
        ..Default::default()
    };
    let result = pipeline.run("q", &conversation(), &config).await.unwrap();

    let PipelineOutcome::Single { metadata, .. } = result.outcome else {
        panic!("expected single-mode outcome");
    };
    assert!(metadata.fallback_triggered);
    assert_eq!(metadata.filtered_chunks, 2);
    assert_eq!(metadata.scores_range, Some((0.1, 0.9)));
}

#[tokio::test]
async fn test_retrieval_failure_degrades_to_plain_prompt() {
    let generator = shared(RecordingGenerator::succeeding());
    let pipeline = ContextPipeline::new(shared(FailingRetriever), generator.clone());

    let result = pipeline
        .run("What is in the documents?", &conversation(), &PipelineConfig::default())
        .await
        .unwrap();

    let PipelineOutcome::Single { metadata, messages, .. } = result.outcome else {
        panic!("expected single-mode outcome");
    };
    assert_eq!(metadata.initial_chunks, 0);
    assert_eq!(metadata.context_size, 0);
    assert_eq!(messages, conversation());
    assert_eq!(generator.prompts()[0], conversation());
}

#[tokio::test]
async fn test_compare_mode_runs_both_branches() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.8, 0.7, 0.3, 0.1])));
    let generator = shared(RecordingGenerator::succeeding());
    let pipeline = ContextPipeline::new(retriever.clone(), generator.clone());

    let config = PipelineConfig {
        min_similarity: 0.5,
        compare_mode: true,
        reranker_enabled: true,
        reranker_type: "noop".to_string(),
        ..Default::default()
    };
    let result = pipeline.run("q", &conversation(), &config).await.unwrap();

    let PipelineOutcome::Compare { baseline, enhanced } = result.outcome else {
        panic!("expected compare-mode outcome");
    };

    assert!(baseline.is_success());
    assert!(enhanced.is_success());
    assert_eq!(baseline.metadata.final_chunks, 5);
    assert_eq!(baseline.metadata.reranker_type, "none");
    assert_eq!(enhanced.metadata.filtered_chunks, 3);
    assert_eq!(enhanced.metadata.reranker_type, "noop");
    assert!(baseline.messages[1].content.contains("[doc4:doc4:4]"));
    assert!(!enhanced.messages[1].content.contains("[doc4:doc4:4]"));

    // One retrieval shared by both branches, two generations
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
    assert_eq!(generator.prompts().len(), 2);
}

#[tokio::test]
async fn test_compare_mode_reports_enhanced_failure() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.8, 0.7, 0.3, 0.1])));
    // Only the baseline prompt carries the low-scoring passages
    let generator = shared(RecordingGenerator::failing_when(|messages| {
        !messages.iter().any(|m| m.content.contains("[doc3:doc3:3]"))
    }));
    let pipeline = ContextPipeline::new(retriever, generator);

    let config = PipelineConfig {
        min_similarity: 0.5,
        compare_mode: true,
        ..Default::default()
    };
    let result = pipeline.run("q", &conversation(), &config).await.unwrap();

    let PipelineOutcome::Compare { baseline, enhanced } = result.outcome else {
        panic!("expected compare-mode outcome");
    };

    assert!(baseline.answer.is_some());
    assert!(baseline.error.is_none());
    assert!(enhanced.answer.is_none());
    let error = enhanced.error.expect("enhanced branch error");
    assert_eq!(error.kind, "generation_upstream_error");
    assert!(error.detail.contains("model overloaded"));
    assert_eq!(enhanced.metadata.filtered_chunks, 3);
}

#[tokio::test]
async fn test_compare_mode_both_failing_is_an_error() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9])));
    let pipeline = ContextPipeline::new(retriever, shared(RecordingGenerator::failing_when(|_| true)));

    let config = PipelineConfig {
        compare_mode: true,
        ..Default::default()
    };
    let err = pipeline.run("q", &conversation(), &config).await.unwrap_err();

    assert!(matches!(err, PipelineError::AllBranchesFailed { .. }));
    assert_eq!(err.to_payload().kind, "all_branches_failed");
}

#[tokio::test]
async fn test_single_mode_generation_failure_is_fatal() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9])));
    let pipeline = ContextPipeline::new(retriever, shared(RecordingGenerator::failing_when(|_| true)));

    let err = pipeline
        .run("q", &conversation(), &PipelineConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Generation(GenerationError::Upstream { .. })));
}

#[tokio::test]
async fn test_missing_user_message_is_rejected_before_retrieval() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9])));
    let pipeline = ContextPipeline::new(retriever.clone(), shared(RecordingGenerator::succeeding()));

    let err = pipeline
        .run("q", &[ChatMessage::system("only rules")], &PipelineConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoUserMessage));
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_caller_messages_left_untouched() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.8])));
    let pipeline = ContextPipeline::new(retriever, shared(RecordingGenerator::succeeding()));
    let messages = conversation();

    let config = PipelineConfig {
        compare_mode: true,
        ..Default::default()
    };
    pipeline.run("q", &messages, &config).await.unwrap();

    assert_eq!(messages, conversation());
}

/// Both calls must be in flight at once to get past the barrier
struct RendezvousGenerator {
    barrier: Barrier,
}

#[async_trait]
impl Generator for RendezvousGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        self.barrier.wait().await;
        Ok(Completion {
            content: "met".to_string(),
            token_usage: None,
            model: "rendezvous".to_string(),
            latency_ms: 0,
        })
    }
}

#[tokio::test]
async fn test_compare_generations_run_concurrently() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.8])));
    let generator = shared(RendezvousGenerator {
        barrier: Barrier::new(2),
    });
    let pipeline = ContextPipeline::new(retriever, generator);

    let config = PipelineConfig {
        compare_mode: true,
        ..Default::default()
    };
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.run("q", &conversation(), &config),
    )
    .await
    .expect("branches should not wait on each other")
    .unwrap();

    assert!(matches!(result.outcome, PipelineOutcome::Compare { .. }));
}

/// Never finishes; flags when its future is dropped
struct HangingGenerator {
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Generator for HangingGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending::<()>().await;
        unreachable!()
    }
}

#[tokio::test]
async fn test_timeout_cancels_in_flight_generation() {
    let dropped = Arc::new(AtomicBool::new(false));
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9])));
    let generator = shared(HangingGenerator {
        dropped: dropped.clone(),
    });
    let pipeline = ContextPipeline::new(retriever, generator);

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        pipeline.run("q", &conversation(), &PipelineConfig::default()),
    )
    .await;

    assert!(outcome.is_err());
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_result_serializes_for_callers() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.2])));
    let pipeline = ContextPipeline::new(retriever, shared(RecordingGenerator::succeeding()));

    let config = PipelineConfig {
        compare_mode: true,
        ..Default::default()
    };
    let result = pipeline.run("q", &conversation(), &config).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["mode"], "compare");
    assert_eq!(json["query"], "q");
    assert!(json["baseline"]["answer"].is_string());
    assert_eq!(json["enhanced"]["metadata"]["initial_chunks"], 2);
    assert!(json["request_id"].is_string());
}

/// Reverses passage order so the effect is visible in the prompt
struct ReversingReranker;

#[async_trait]
impl citerag::rag::Reranker for ReversingReranker {
    fn name(&self) -> &str {
        "reverse"
    }

    async fn rerank(
        &self,
        _query: &str,
        mut passages: Vec<citerag::ScoredPassage>,
    ) -> Vec<citerag::ScoredPassage> {
        passages.reverse();
        passages
    }
}

#[tokio::test]
async fn test_registered_reranker_orders_context() {
    let mut registry = citerag::rag::RerankerRegistry::new();
    registry.register(ReversingReranker);

    let retriever = shared(FixedRetriever::new(scored_passages(&[0.9, 0.8])));
    let pipeline = ContextPipeline::with_rerankers(
        retriever,
        shared(RecordingGenerator::succeeding()),
        registry,
    );

    let config = PipelineConfig {
        reranker_enabled: true,
        reranker_type: "reverse".to_string(),
        ..Default::default()
    };
    let result = pipeline.run("q", &conversation(), &config).await.unwrap();

    let PipelineOutcome::Single { metadata, messages, .. } = result.outcome else {
        panic!("expected single-mode outcome");
    };
    assert_eq!(metadata.reranker_type, "reverse");
    let prompt = &messages[1].content;
    let first = prompt.find("[doc1:doc1:1]").unwrap();
    let second = prompt.find("[doc0:doc0:0]").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_default_threshold_keeps_negative_scores() {
    let retriever = shared(FixedRetriever::new(scored_passages(&[0.5, -0.1, -0.2])));
    let pipeline = ContextPipeline::new(retriever, shared(RecordingGenerator::succeeding()));

    let result = pipeline
        .run("q", &conversation(), &PipelineConfig::default())
        .await
        .unwrap();

    let PipelineOutcome::Single { metadata, messages, .. } = result.outcome else {
        panic!("expected single-mode outcome");
    };
    assert_eq!(metadata.filtered_chunks, 3);
    assert_eq!(metadata.final_chunks, 3);
    assert!(!metadata.fallback_triggered);
    assert!(messages[1].content.contains("[doc2:doc2:2]"));
}

#[tokio::test]
async fn test_blank_passages_never_cited() {
    let mut passages = scored_passages(&[0.9, 0.8]);
    passages[1].text = "  \n".to_string();
    let retriever = shared(FixedRetriever::new(passages));
    let pipeline = ContextPipeline::new(retriever, shared(RecordingGenerator::succeeding()));

    let result = pipeline
        .run("q", &conversation(), &PipelineConfig::default())
        .await
        .unwrap();

    let PipelineOutcome::Single { metadata, messages, .. } = result.outcome else {
        panic!("expected single-mode outcome");
    };
    assert_eq!(metadata.initial_chunks, 1);
    assert!(messages[1].content.contains("[doc0:doc0:0]"));
    assert!(!messages[1].content.contains("[doc1:doc1:1]"));
}
