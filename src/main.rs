use std::error::Error;
use std::sync::Arc;

use ai_llm_service::{LlmServiceProfiles, telemetry};
use clap::Parser;
use colored::Colorize;
use graph_store::{GraphConfig, Neo4jClient};
use query_pipeline::adapters::live_pipeline;
use query_pipeline::{PipelineConfig, SearchResult};
use tracing::{debug, error};

/// Answer a question against the Neo4j graph.
#[derive(Debug, Parser)]
#[command(name = "graph-qa-backend", version, about)]
struct Cli {
    /// Natural-language question.
    question: String,

    /// Maximum rows per synthesized query (overrides RESULT_LIMIT).
    #[arg(long)]
    result_limit: Option<u64>,

    /// Allow the schema-based fallback (overrides ALLOW_FALLBACK).
    #[arg(long)]
    fallback: bool,

    /// Fetch candidates one after another for readable logs (overrides PIPELINE_SEQUENTIAL).
    #[arg(long)]
    sequential: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // .env is optional; real environment variables win.
    let dotenv = dotenvy::dotenv();
    telemetry::init("info");
    if let Err(e) = dotenv {
        debug!("no .env loaded: {e}");
    }

    let cli = Cli::parse();

    let mut cfg = PipelineConfig::from_env()?;
    if let Some(limit) = cli.result_limit {
        cfg.result_limit = limit;
    }
    cfg.allow_fallback |= cli.fallback;
    cfg.sequential |= cli.sequential;
    cfg.validate()?;

    let svc = Arc::new(LlmServiceProfiles::from_env()?);
    let client = Arc::new(Neo4jClient::new(GraphConfig::from_env())?);
    let pipeline = live_pipeline(svc, client, cfg);

    let result = match pipeline.search(&cli.question).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "search failed");
            return Err(e.into());
        }
    };

    print_summary(&result);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_summary(result: &SearchResult) {
    if result.is_empty() {
        eprintln!("{}", "no answer found".yellow().bold());
        return;
    }
    for item in &result.data {
        let query = item
            .queries
            .first()
            .map(|q| q.query.replace('\n', " "))
            .unwrap_or_default();
        eprintln!(
            "{} {} {} {}",
            format!("#{}", item.order).dimmed(),
            item.output.green().bold(),
            format!("[{} | {} rows]", item.visualization, item.data.len()).cyan(),
            query.dimmed()
        );
    }
}
