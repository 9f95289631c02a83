//! Batch driver: builds the retrieval index or runs a comparison from the
//! command line, without going through the HTTP facade.
//!
//! Usage:
//!   rag-arena-compare index <corpus_dir>
//!   rag-arena-compare compare <question> [k] [--sequential]

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};

use rag_arena::compare::{ComparisonResults, ModelComparison};
use rag_arena::core::logging;
use rag_arena::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    logging::init(&state.paths);

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("index") => {
            let dir = args
                .get(1)
                .map(PathBuf::from)
                .context("Usage: rag-arena-compare index <corpus_dir>")?;
            let chunks = state.rag.rebuild_from_dir(&dir).await?;
            println!("Indexed {} chunks from {}", chunks, dir.display());
        }
        Some("compare") => {
            let question = args
                .get(1)
                .cloned()
                .context("Usage: rag-arena-compare compare <question> [k] [--sequential]")?;
            let k = args
                .get(2)
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(3);
            let parallel = !args.iter().any(|a| a == "--sequential");

            let comparison = ModelComparison::new(
                state.settings.models.compare.clone(),
                state.rag.clone(),
                state.provider.clone(),
            );

            println!(
                "Running {} comparison across {} models...",
                if parallel { "parallel" } else { "sequential" },
                comparison.models().len()
            );
            let results = comparison.compare(&question, k, parallel).await;
            print_comparison(&results);
        }
        _ => bail!("Usage: rag-arena-compare <index|compare> ..."),
    }

    Ok(())
}

fn print_comparison(results: &ComparisonResults) {
    println!("\n{}", "=".repeat(80));
    println!("COMPARISON RESULTS");
    println!("{}", "=".repeat(80));

    let times: Vec<f64> = results
        .iter()
        .filter(|r| r.time > 0.0)
        .map(|r| r.time)
        .collect();
    if !times.is_empty() {
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let fastest = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let slowest = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        println!("\nPerformance Summary:");
        println!("  Average Response Time: {:.2}s", avg);
        println!("  Fastest: {:.2}s", fastest);
        println!("  Slowest: {:.2}s", slowest);
    }

    for result in results.iter() {
        println!("\nModel: {}", result.model);
        println!("Time: {}s", result.time);
        println!(
            "Metrics: {} words, {} tokens/sec",
            result.metrics.word_count, result.metrics.tokens_per_second
        );
        let preview: String = result.answer.chars().take(300).collect();
        println!("Answer: {}...", preview);
        println!("{}", "-".repeat(80));
    }
}
