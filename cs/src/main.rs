use std::path::Path;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde_json::Value;

use chunkstore::cli::{Cli, Command};
use chunkstore::{ChunkingConfig, Splitter, TokenEstimator};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse JSON in {}", path.display()))
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = ChunkingConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("chunkstore starting");

    match cli.command {
        Command::Estimate {
            path,
            model,
            formatted,
        } => {
            let payload = read_json(&path)?;
            let model = model.unwrap_or(config.model);
            let estimator = TokenEstimator::new(model.clone())?;
            let tokens = estimator.estimate(&payload, formatted);
            println!("{} {} tokens ({})", "✓".green(), tokens.to_string().cyan(), model);
        }
        Command::Split { path, budget } => {
            let payload = read_json(&path)?;
            let budget = budget.unwrap_or(config.max_tokens);
            let estimator = TokenEstimator::new(config.model.clone())?;
            let total = estimator.estimate(&payload, true);

            if total <= budget {
                println!("{} fits inline: {} of {} tokens", "✓".green(), total, budget);
                return Ok(());
            }

            let splitter = Splitter::new(&estimator, budget);
            let outcome = splitter.split(&payload);
            let status = if outcome.has_oversized() {
                "!".yellow()
            } else {
                "✓".green()
            };
            println!(
                "{} {} chunks, {} records, layout {:?}, budget {}",
                status,
                outcome.fragments.len().to_string().cyan(),
                outcome.total_records,
                outcome.layout,
                splitter.budget()
            );
            for fragment in &outcome.fragments {
                let tokens = estimator.estimate(&fragment.data, true);
                let marker = if fragment.oversized {
                    " oversized".yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  chunk {:>4}: {:>6} records {:>7} tokens{}",
                    fragment.index,
                    fragment.record_count,
                    tokens.to_string().dimmed(),
                    marker
                );
            }
        }
    }

    Ok(())
}
