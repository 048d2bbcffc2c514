use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::request::RequestKind;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// How summaries are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Client for the SmartAPI credit-reporting XML protocol
#[derive(Parser, Debug, Clone)]
#[command(name = "smartapi-credit")]
#[command(about = "Build, submit, and inspect SmartAPI credit report documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// SmartAPI endpoint URL
    #[arg(long = "url", global = true)]
    pub url: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout: Option<u64>,

    /// Number of retry attempts for failed requests
    #[arg(long = "retry-attempts", global = true)]
    pub retry_attempts: Option<u32>,

    /// Upper bound in milliseconds on the backoff between retries
    #[arg(long = "max-retry-delay", global = true)]
    pub max_retry_delay_ms: Option<u64>,

    /// Seconds between status queries while an order is pending
    #[arg(long = "poll-interval", global = true)]
    pub poll_interval: Option<u64>,

    /// Status queries to send before giving up
    #[arg(long = "max-polls", global = true)]
    pub max_polls: Option<u32>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serialize a request file (TOML or JSON) and print the document
    Render {
        request: PathBuf,

        /// Override the request kind named in the file
        #[arg(long = "kind", value_parser = parse_kind)]
        kind: Option<RequestKind>,
    },

    /// Summarize a saved response document
    Inspect { response: PathBuf },

    /// Submit a request file and poll until the order finishes
    Order {
        request: PathBuf,

        /// Write the first embedded report (PDF or HTML) to this path
        #[arg(long = "save-report")]
        save_report: Option<PathBuf>,
    },
}

fn parse_kind(value: &str) -> Result<RequestKind, String> {
    value.parse().map_err(|e: crate::error::CreditError| e.to_string())
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
