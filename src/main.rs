//! citerag - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use citerag::{
    cli::{display, Args, AskArgs, Commands, Verbosity},
    config::Config,
    generation::ChatCompletionsClient,
    logging,
    rag::{ChunkenizerClient, ContextPipeline, RerankerRegistry},
    ChatMessage, ErrorPayload,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    logging::init(verbosity);

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match &args.command {
        Commands::Ask(ask) => run_ask(ask, &config, verbosity).await,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("{}", rendered);
            Ok(())
        }
        Commands::Rerankers => {
            for name in RerankerRegistry::default().names() {
                println!("  {} {}", "•".cyan(), name);
            }
            Ok(())
        }
    }
}

async fn run_ask(ask: &AskArgs, config: &Config, verbosity: Verbosity) -> Result<()> {
    let pipeline_config = ask.pipeline_config(&config.pipeline);
    debug!(?pipeline_config, "effective pipeline config");

    let mut messages = match &ask.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    messages.push(ChatMessage::user(ask.query.clone()));

    let retriever = ChunkenizerClient::new(
        Some(config.retrieval.base_url.clone()),
        Duration::from_secs(config.retrieval.timeout_secs),
    )
    .context("Failed to create search client")?;
    let generator = ChatCompletionsClient::from_env(config.generation.clone())
        .context("Failed to create generation client")?;
    let pipeline = ContextPipeline::new(Arc::new(retriever), Arc::new(generator));

    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let run = tokio::time::timeout(
        request_timeout,
        pipeline.run(&ask.query, &messages, &pipeline_config),
    );

    // Dropping `run` on interrupt or timeout cancels any generation in flight
    let outcome = tokio::select! {
        outcome = run => outcome,
        _ = tokio::signal::ctrl_c() => {
            report_error(
                &ErrorPayload {
                    kind: "cancelled".to_string(),
                    detail: "Request cancelled".to_string(),
                },
                ask.json,
            )?;
            std::process::exit(130);
        }
    };

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            report_error(&err.to_payload(), ask.json)?;
            std::process::exit(1);
        }
        Err(_) => {
            report_error(
                &ErrorPayload {
                    kind: "request_timeout".to_string(),
                    detail: format!("Request timed out after {}s", request_timeout.as_secs()),
                },
                ask.json,
            )?;
            std::process::exit(1);
        }
    };

    if ask.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", display::render_result(&result, verbosity.show_metadata()));
    }
    Ok(())
}

fn load_history(path: &Path) -> Result<Vec<ChatMessage>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse history file {}", path.display()))
}

fn report_error(error: &ErrorPayload, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "error": error }))?
        );
    } else {
        eprint!("{}", display::render_error(error));
    }
    Ok(())
}
