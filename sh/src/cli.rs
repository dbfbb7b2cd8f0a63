//! CLI argument parsing for stateholder

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stateholder")]
#[command(author, version, about = "Single-writer key-value state holder", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log every event the worker handles (READ, WRITE, RESET, STOP)
    #[arg(long, global = true)]
    pub log_events: bool,

    /// Queue writes without waiting for the worker to acknowledge them
    #[arg(long, global = true)]
    pub fire_and_forget: bool,

    /// Poll the worker's channels every N milliseconds instead of suspending
    #[arg(long, global = true)]
    pub poll_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a command script (stdin when no file is given)
    Run {
        /// Script file, one command per line
        script: Option<PathBuf>,

        /// Stop at the first failing command
        #[arg(long)]
        strict: bool,
    },

    /// Drive many concurrent callers against one worker and verify the result
    Stress {
        /// Number of concurrent tasks
        #[arg(short, long, default_value_t = 16)]
        tasks: usize,

        /// Write/read rounds per task
        #[arg(short, long, default_value_t = 1000)]
        ops: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}
