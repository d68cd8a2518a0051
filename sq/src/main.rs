//! SqlTools - CLI entry point
//!
//! Logs go to a file; stdout carries tool output and the server protocol.

use std::fs;
use std::sync::Arc;

use chunkstore::estimate_error_text;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

use sqltools::cli::{Cli, Command, get_log_path};
use sqltools::config::Config;
use sqltools::server::ToolServer;
use sqltools::tools::{ToolCall, ToolContext, ToolExecutor};
use sqltools::warehouse::StatementExecutor;

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    let level = match level.map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn statement_executor(config: &Config) -> Result<Arc<StatementExecutor>> {
    config.validate().context("Invalid configuration")?;
    let executor = StatementExecutor::new(&config.query).context("Failed to create statement executor")?;
    Ok(Arc::new(executor))
}

async fn cmd_serve(config: &Config) -> Result<()> {
    let ctx = ToolContext::from_config(config, statement_executor(config)?)
        .context("Failed to initialize token estimator")?;
    let server = ToolServer::new(Arc::new(ToolExecutor::standard()), ctx);
    server.serve_stdio(config.chunking.sweep_interval()).await
}

async fn cmd_query(
    config: &Config,
    sql: String,
    workspace: Option<String>,
    max_tokens: Option<usize>,
    no_chunk: bool,
) -> Result<()> {
    // Query output is always an envelope, including estimator failures
    let ctx = match ToolContext::from_config(config, statement_executor(config)?) {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("{}", estimate_error_text(&e));
            return Err(e).context("Failed to initialize token estimator");
        }
    };
    let call = ToolCall {
        id: "cli".to_string(),
        name: "execute_sql".to_string(),
        input: json!({
            "sql": sql,
            "workspace": workspace,
            "max_tokens": max_tokens,
            "auto_chunk": !no_chunk,
        }),
    };

    let result = ToolExecutor::standard().execute(&call, &ctx).await;
    println!("{}", result.content);
    if result.is_error {
        return Err(eyre::eyre!("execute_sql failed"));
    }
    Ok(())
}

fn cmd_tools(json_output: bool) -> Result<()> {
    let definitions = ToolExecutor::standard().definitions();
    if json_output {
        let text = serde_json::to_string_pretty(&definitions).context("Failed to serialize tool definitions")?;
        println!("{}", text);
        return Ok(());
    }

    for definition in definitions {
        println!("{}", definition.name.cyan());
        println!("    {}", definition.description.dimmed());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.effective_log_level()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(role = %config.role, workspaces = config.workspaces.len(), "SqlTools loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve => cmd_serve(&config).await,
        Command::Query {
            sql,
            workspace,
            max_tokens,
            no_chunk,
        } => cmd_query(&config, sql, workspace, max_tokens, no_chunk).await,
        Command::Tools { json } => cmd_tools(json),
    }
}
