//! Mentor CLI: run one math problem through the pipeline.
//!
//! Usage:
//!   mentor --problem "Solve x^2 - 4x + 4 = 0"
//!   mentor --config config.toml --problem "..."
//!   echo "Solve x^2 - 4x + 4 = 0" | mentor
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` - key for the configured provider
//! - `RUST_LOG` - log filter (default: info)

use std::io::Read;
use std::sync::Arc;

use mentor_llm::{build_reasoning_model, ModelConfig, RetryPolicy};
use mentor_memory::MemoryStore;
use mentor_pipeline::{AutoApproveReviews, Intake, Orchestrator, PipelineConfig};
use mentor_retrieval::{HashEmbedder, KnowledgeIndex};
use mentor_symbolic::ClosedFormEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Starter knowledge snippets seeded into the retrieval index when no
/// corpus is configured.
const BUILTIN_SNIPPETS: &[&str] = &[
    "A quadratic equation ax^2 + bx + c = 0 has roots x = (-b ± sqrt(b^2 - 4ac)) / 2a.",
    "The discriminant b^2 - 4ac determines the number of real roots: two when positive, one when zero, none when negative.",
    "A perfect square trinomial a^2 ± 2ab + b^2 factors as (a ± b)^2.",
    "Average speed is total distance divided by total time.",
    "The derivative of x^n with respect to x is n*x^(n-1).",
    "For independent events, P(A and B) = P(A) * P(B).",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut problem: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--problem" | "-p" => {
                if i + 1 < args.len() {
                    problem = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mentor - staged math problem solver");
                println!();
                println!("Usage: mentor [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <FILE>    Path to config.toml");
                println!("  -p, --problem <TEXT>   Problem statement (reads stdin if omitted)");
                println!("  -h, --help             Show this help message");
                println!();
                println!("Environment variables:");
                println!("  OPENAI_API_KEY         API key for the openai provider");
                println!("  ANTHROPIC_API_KEY      API key for the anthropic provider");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = if let Some(path) = config_path {
        tracing::info!(path = %path, "Loading configuration");
        PipelineConfig::from_file(&path)?
    } else {
        tracing::info!("Using default configuration");
        PipelineConfig::with_model(ModelConfig {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            api_url: None,
            temperature: None,
            max_tokens: None,
            timeout_ms: 60_000,
            max_concurrent_requests: 2,
            retry: RetryPolicy::default(),
        })
    };

    let problem_text = match problem {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer.trim().to_string()
        }
    };
    if problem_text.is_empty() {
        anyhow::bail!("no problem given; pass --problem or pipe text on stdin");
    }

    let model = build_reasoning_model(&config.model)?;
    let memory = Arc::new(MemoryStore::open(config.memory.clone()).await?);
    let retriever = Arc::new(KnowledgeIndex::with_snippets(
        Arc::new(HashEmbedder::default()),
        BUILTIN_SNIPPETS.iter().map(|s| s.to_string()),
    ));

    let orchestrator = Orchestrator::new(
        model,
        retriever,
        Arc::new(ClosedFormEngine::new()),
        memory.clone(),
        Arc::new(AutoApproveReviews),
        &config,
    );

    let submission = Intake::new().from_text(problem_text);
    let record = orchestrator.run(submission).await;

    println!("{}", serde_json::to_string_pretty(&record)?);
    tracing::info!(total_solved = memory.count().await, "Memory log updated");

    Ok(())
}
