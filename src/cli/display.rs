//! Terminal rendering of pipeline results

use colored::Colorize;

use crate::errors::ErrorPayload;
use crate::rag::pipeline::{BranchResult, PipelineOutcome, PipelineResult};
use crate::telemetry::Observability;

/// Render a pipeline result for the terminal
pub fn render_result(result: &PipelineResult, show_metadata: bool) -> String {
    let mut out = String::new();

    match &result.outcome {
        PipelineOutcome::Single {
            completion,
            metadata,
            ..
        } => {
            out.push_str(&completion.content);
            out.push('\n');
            if show_metadata {
                out.push('\n');
                out.push_str(&render_metadata(metadata));
                out.push_str(&format!(
                    "  {} {} ({}ms)\n",
                    "model:".dimmed(),
                    completion.model,
                    completion.latency_ms
                ));
            }
        }
        PipelineOutcome::Compare { baseline, enhanced } => {
            out.push_str(&render_branch("Baseline (unfiltered)", baseline, show_metadata));
            out.push('\n');
            out.push_str(&render_branch("Enhanced (filtered + reranked)", enhanced, show_metadata));
        }
    }

    if show_metadata {
        out.push_str(&format!("  {} {}\n", "request:".dimmed(), result.request_id));
    }
    out
}

fn render_branch(title: &str, branch: &BranchResult, show_metadata: bool) -> String {
    let mut out = format!("{}\n{}\n", title.bold().cyan(), "-".repeat(60).cyan());

    match (&branch.answer, &branch.error) {
        (Some(answer), _) => {
            out.push_str(answer);
            out.push('\n');
        }
        (None, Some(error)) => out.push_str(&render_error(error)),
        (None, None) => {}
    }

    if show_metadata {
        out.push_str(&render_metadata(&branch.metadata));
    }
    out
}

/// One line per stage count, dimmed
pub fn render_metadata(metadata: &Observability) -> String {
    let range = metadata
        .scores_range
        .map(|(lo, hi)| format!("[{:.3}, {:.3}]", lo, hi))
        .unwrap_or_else(|| "n/a".to_string());

    let fallback = if metadata.fallback_triggered {
        "fallback".yellow().to_string()
    } else {
        "no fallback".to_string()
    };

    format!(
        "  {} {} -> {} -> {} (threshold {:.2}, {}, scores {})\n  {} {} ({} chars{})\n",
        "chunks:".dimmed(),
        metadata.initial_chunks,
        metadata.filtered_chunks,
        metadata.final_chunks,
        metadata.threshold,
        fallback,
        range,
        "reranker:".dimmed(),
        metadata.reranker_type,
        metadata.context_size,
        if metadata.truncated { ", truncated" } else { "" },
    )
}

/// Structured error, as shown to the user
pub fn render_error(error: &ErrorPayload) -> String {
    format!("{} {} ({})\n", "Error:".red().bold(), error.detail.red(), error.kind)
}
