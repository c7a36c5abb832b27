//! Command-line argument parsing for citerag
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::rag::pipeline::PipelineConfig;

/// citerag - Ground chat answers in retrieved, citation-tagged passages
#[derive(Parser, Debug)]
#[command(name = "citerag")]
#[command(version)]
#[command(about = "Retrieval-augmented answers with citations and baseline comparison", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.citerag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question using retrieved context
    Ask(AskArgs),

    /// Display current configuration
    Config,

    /// List available reranker types
    Rerankers,
}

/// Options for a single question
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AskArgs {
    /// The question; used for retrieval and sent as the final user message
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// JSON file with earlier conversation messages ([{"role": ..., "content": ...}])
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Produce a baseline and an enhanced answer side by side
    #[arg(long)]
    pub compare: bool,

    /// Similarity threshold for passages (0.0 keeps everything)
    #[arg(long)]
    pub min_similarity: Option<f64>,

    /// Fewest passages kept when the threshold is too strict
    #[arg(long)]
    pub min_chunks: Option<usize>,

    /// Enable reranking with this reranker type (e.g. noop, lexical)
    #[arg(long, value_name = "TYPE")]
    pub reranker: Option<String>,

    /// Character budget for the context block
    #[arg(long)]
    pub max_context_chars: Option<usize>,

    /// Passages to request from retrieval
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl AskArgs {
    /// New pipeline config with the flags given on the command line laid over `base`
    pub fn pipeline_config(&self, base: &PipelineConfig) -> PipelineConfig {
        let mut config = base.clone();
        if self.compare {
            config.compare_mode = true;
        }
        if let Some(min_similarity) = self.min_similarity {
            config.min_similarity = min_similarity;
        }
        if let Some(min_chunks) = self.min_chunks {
            config.min_chunks = min_chunks;
        }
        if let Some(reranker) = &self.reranker {
            config.reranker_enabled = true;
            config.reranker_type = reranker.clone();
        }
        if let Some(max_context_chars) = self.max_context_chars {
            config.max_context_chars = max_context_chars;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        config
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if stage metadata should be printed with the answer
    pub fn show_metadata(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
