//! CLI argument parsing for chunkstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cs")]
#[command(author, version, about = "Token-bounded response chunking", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate the token cost of a JSON file
    Estimate {
        /// JSON file to measure
        #[arg(required = true)]
        path: PathBuf,

        /// Model identifier (default: from config)
        #[arg(short, long)]
        model: Option<String>,

        /// Measure the pretty-printed form
        #[arg(short, long)]
        formatted: bool,
    },

    /// Show how a JSON file would be split into chunks
    Split {
        /// JSON file to split
        #[arg(required = true)]
        path: PathBuf,

        /// Token budget per chunk (default: from config)
        #[arg(short, long)]
        budget: Option<usize>,
    },
}
