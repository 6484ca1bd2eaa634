//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Environment variable holding the password for non-interactive use
pub const PASSWORD_ENV: &str = "LEARNLOOP_PASSWORD";

/// learnloop - adaptive learning in the terminal
#[derive(Parser)]
#[command(
    name = "ll",
    about = "Terminal client for an adaptive-learning recommendation service",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Run without a command to open the interactive dashboard."
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

    /// Service base URL, overriding config and LEARNLOOP_API_URL
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account, then log in
    Register {
        #[arg(short, long)]
        user_id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (prompted when omitted)
        #[arg(short, long, env = PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,

        /// Self-declared level
        #[arg(long)]
        level: Option<String>,
    },

    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        user_id: String,

        /// Password (prompted when omitted)
        #[arg(short, long, env = PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,
    },

    /// End the session and forget the stored token
    Logout,

    /// Show the logged-in learner
    Whoami,

    /// Show recent interactions, newest first
    History {
        /// Number of interactions to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show progress per skill
    Progress {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Ask the service for the next exercise
    Next {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for report commands
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
            _ => Err(format!("Unknown format '{}', expected text or json", s)),
        }
    }
}
