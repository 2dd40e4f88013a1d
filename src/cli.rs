//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Acquire an authenticated session against a form-login portal.
///
/// `login` posts the configured credentials and reports whether the portal
/// issued a session cookie. `status` reads or writes the scraper's
/// last-processed-date marker.
#[derive(Parser, Debug)]
#[command(name = "scraper-session")]
#[command(author, version, about, arg_required_else_help = true)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/scraper-session/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write Prometheus metrics for this run to PATH on exit
    #[arg(long, global = true, value_name = "PATH")]
    pub metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in, retrying transient failures
    Login(LoginArgs),

    /// Read or update the last processed date
    Status(StatusArgs),
}

#[derive(ClapArgs, Debug)]
pub struct LoginArgs {
    /// Endpoint that receives the login form
    #[arg(long, env = "SCRAPER_LOGIN_URL")]
    pub login_url: Option<String>,

    /// Portal base URL, sent as the Referer header
    #[arg(long, env = "SCRAPER_BASE_URL")]
    pub base_url: Option<String>,

    /// Login username
    #[arg(short, long, env = "SCRAPER_USERNAME")]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "SCRAPER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Maximum login attempts (1-20)
    #[arg(short = 'a', long, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds (max 600000)
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u64).range(0..=600_000))]
    pub retry_delay_ms: Option<u64>,

    /// Overall deadline for the whole login sequence in seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: Option<u64>,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout_secs: Option<u64>,

    /// HTTP request timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub request_timeout_secs: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct StatusArgs {
    /// Status database path
    #[arg(long, env = "SCRAPER_DATABASE", value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub action: StatusAction,
}

#[derive(Subcommand, Debug)]
pub enum StatusAction {
    /// Print the last processed date
    Get {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a new last processed date (RFC 3339 or YYYY-MM-DD)
    Set {
        /// The date to record
        date: String,
    },
}
