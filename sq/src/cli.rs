//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// SqlTools - SQL warehouse tools for LLM agents
#[derive(Parser)]
#[command(
    name = "sq",
    about = "SQL warehouse tools with token-bounded, chunked responses",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective log level from the flags
    pub fn effective_log_level(&self) -> Option<&str> {
        if self.verbose {
            return Some("DEBUG");
        }
        self.log_level.as_deref()
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve tools over stdin/stdout as line-delimited JSON
    Serve,

    /// Run one statement and print the tool response
    Query {
        /// SQL statement
        sql: String,

        /// Workspace name (honored for the developer role only)
        #[arg(short, long)]
        workspace: Option<String>,

        /// Token budget for the response
        #[arg(short, long)]
        max_tokens: Option<usize>,

        /// Return the whole result inline
        #[arg(long)]
        no_chunk: bool,
    },

    /// List tool definitions
    Tools {
        /// Print full definitions as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Get the path to the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqltools")
        .join("logs")
        .join("sqltools.log")
}
