//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{JobId, Strategy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deal Wizard - property investment analysis from the terminal
///
/// Submit a property listing for analysis under a FLIP, BTL, or HMO
/// strategy, then wait for the report to be generated.
///
/// Examples:
///   dealwizard strategy set btl
///   dealwizard goal set "7% gross yield"
///   dealwizard analyze https://www.rightmove.co.uk/properties/123456
///   dealwizard watch 1700000000000x123456789
///   dealwizard status 1700000000000x123456789 --json
///   dealwizard init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dealwizard.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the file remembering strategy and goal
    #[arg(long, value_name = "FILE", global = true, env = "DEALWIZARD_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Analysis webhook URL
    #[arg(long, value_name = "URL", global = true, env = "DEALWIZARD_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Status endpoint URL template ({job_id} is substituted)
    #[arg(long, value_name = "URL", global = true, env = "DEALWIZARD_STATUS_URL")]
    pub status_url: Option<String>,

    /// Delay between status checks in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub interval_ms: Option<u64>,

    /// Number of status checks before giving up
    #[arg(long, value_name = "COUNT", global = true)]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Submit a listing for analysis and wait for the report
    Analyze {
        /// Listing page URL
        #[arg(value_name = "URL")]
        url: String,

        /// Strategy to analyze under (defaults to the saved strategy)
        #[arg(short, long, value_name = "STRATEGY")]
        strategy: Option<Strategy>,

        /// Investment goal (defaults to the saved goal)
        #[arg(short, long, value_name = "GOAL")]
        goal: Option<String>,

        /// Submit only; print the job id without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Wait for the report of an already submitted job
    Watch {
        /// Job id returned by the webhook
        #[arg(value_name = "JOB_ID")]
        job_id: JobId,
    },

    /// Check the status of a job once
    Status {
        /// Job id returned by the webhook
        #[arg(value_name = "JOB_ID")]
        job_id: JobId,

        /// Print the raw status payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the saved strategy
    Strategy {
        #[command(subcommand)]
        action: Option<StrategyAction>,
    },

    /// Show or change the saved investment goal
    Goal {
        #[command(subcommand)]
        action: Option<GoalAction>,
    },

    /// Generate a default .dealwizard.toml configuration file
    InitConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum StrategyAction {
    /// Remember a strategy
    Set { strategy: Strategy },
    /// Forget the saved strategy
    Clear,
    /// Print the saved strategy
    Show,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GoalAction {
    /// Remember a goal
    Set { goal: String },
    /// Forget the saved goal
    Clear,
    /// Print the saved goal
    Show,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Analyze { ref url, .. } = self.command {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Listing URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref url) = self.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Webhook URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref url) = self.status_url {
            if !url.contains("{job_id}") {
                return Err("Status URL must contain a {job_id} placeholder".to_string());
            }
        }

        if self.interval_ms == Some(0) {
            return Err("Interval must be at least 1 millisecond".to_string());
        }

        if self.max_attempts == Some(0) {
            return Err("Max attempts must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
