//! CLI command definitions and subcommands

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;

/// dailyplan - bounded daily plans from your issue tracker
#[derive(Parser)]
#[command(
    name = "dp",
    about = "Classify open issues and plan a focused day",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help(),
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

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate today's plan
    Plan {
        /// Previous day's closure rate (0.0-1.0); defaults to the ledger
        #[arg(long)]
        closure_rate: Option<f64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Ask for approval before printing the final plan
        #[arg(short, long)]
        review: bool,
    },

    /// Re-plan today around a blocking issue
    Replan {
        /// Key of the blocking issue
        key: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Propose day-sized subtasks for a multi-day issue
    Decompose {
        /// Issue key
        key: String,

        /// Create the subtasks after approval
        #[arg(long)]
        create: bool,
    },

    /// Record or inspect the daily closure rate
    Closure {
        #[command(subcommand)]
        command: ClosureCommand,
    },

    /// Run the background scheduler until Ctrl-C
    Watch {
        /// Run a single poll cycle, drain the queue and exit
        #[arg(long)]
        once: bool,
    },
}

/// Closure ledger subcommands
#[derive(Debug, Subcommand)]
pub enum ClosureCommand {
    /// Save the closure record for a day's plan
    Save {
        /// Plan date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show the closure record for a day
    Show {
        /// Record date (YYYY-MM-DD), defaults to yesterday
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

/// Output format for plan commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use text or json", s)),
        }
    }
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dailyplan")
        .join("logs")
        .join("dailyplan.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}
