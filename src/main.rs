//! CLI entry point for the scraper-session tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use reqwest::cookie::{CookieStore, Jar};
use scraper_session::transport::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use scraper_session::{
    Context, Credentials, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, Database, HttpClient,
    RetryPolicy, SessionTarget, StatusRepository, retry_login_with_policy,
};
use serde::Serialize;
use tracing::{debug, info, warn};

mod cli;
mod config;

use cli::{Args, Command, LoginArgs, StatusAction, StatusArgs};
use config::FileConfig;

/// Database used by `status` when neither flag, env nor config names one.
const DEFAULT_DATABASE: &str = "scraper-session.db";

/// `--database` value selecting a throwaway in-memory database.
const IN_MEMORY_DATABASE: &str = ":memory:";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = config::load_config(args.config.as_deref());
    let file_verbosity = loaded
        .as_ref()
        .ok()
        .and_then(|loaded| loaded.config.as_ref())
        .and_then(|cfg| cfg.verbosity);

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config file > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_verbosity.map_or("info", config::VerbositySetting::level),
            1 => "debug",
            _ => "trace",
        }
    };
    init_tracing(default_level);

    let loaded = loaded?;
    debug!(path = ?loaded.path, from_file = loaded.config.is_some(), "configuration resolved");
    let file = loaded.file();

    let metrics = match args.metrics_out {
        Some(path) => Some((install_metrics()?, path)),
        None => None,
    };

    let result = match args.command {
        Command::Login(login) => run_login(&login, &file).await,
        Command::Status(status) => run_status(&status, &file).await,
    };

    if let Some((handle, path)) = metrics
        && let Err(error) = write_metrics(&handle, &path).await
    {
        if result.is_ok() {
            return Err(error);
        }
        warn!(error = %error, "failed to write metrics");
    }
    result
}

fn install_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;
    scraper_session::metrics::describe_metrics();
    Ok(handle)
}

async fn write_metrics(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    tokio::fs::write(path, handle.render())
        .await
        .with_context(|| format!("failed to write metrics to '{}'", path.display()))?;
    debug!(path = %path.display(), "metrics written");
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

// ==================== login ====================

/// Fully resolved inputs for one `login` run.
#[derive(Debug)]
struct LoginSettings {
    target: SessionTarget,
    credentials: Credentials,
    policy: RetryPolicy,
    deadline: Option<Duration>,
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
}

impl LoginSettings {
    /// Merges flags (which already include env fallbacks) over the config file.
    fn resolve(args: &LoginArgs, file: &FileConfig) -> Result<Self> {
        let login_url = args
            .login_url
            .clone()
            .or_else(|| file.login_url.clone())
            .context("missing login URL: pass --login-url, set SCRAPER_LOGIN_URL, or add login_url to the config file")?;
        let base_url = args
            .base_url
            .clone()
            .or_else(|| file.base_url.clone())
            .context("missing base URL: pass --base-url, set SCRAPER_BASE_URL, or add base_url to the config file")?;
        let username = args
            .username
            .clone()
            .or_else(|| file.username.clone())
            .context("missing username: pass --username, set SCRAPER_USERNAME, or add username to the config file")?;
        let Some(password) = args.password.clone() else {
            bail!("missing password: pass --password or set SCRAPER_PASSWORD");
        };

        let max_attempts = args
            .max_attempts
            .or(file.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let delay = args
            .retry_delay_ms
            .or(file.retry_delay_ms)
            .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis);

        Ok(Self {
            target: SessionTarget::new(login_url, base_url),
            credentials: Credentials::new(username, password),
            policy: RetryPolicy::new(max_attempts, delay),
            deadline: args.timeout_secs.map(Duration::from_secs),
            connect_timeout_secs: args
                .connect_timeout_secs
                .or(file.connect_timeout_secs)
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            request_timeout_secs: args
                .request_timeout_secs
                .or(file.request_timeout_secs)
                .unwrap_or(REQUEST_TIMEOUT_SECS),
        })
    }
}

#[derive(Debug, Serialize)]
struct LoginReport {
    login_url: String,
    session_cookies: Vec<String>,
}

async fn run_login(args: &LoginArgs, file: &FileConfig) -> Result<()> {
    let settings = LoginSettings::resolve(args, file)?;
    debug!(
        login_url = %settings.target.login_url(),
        max_attempts = settings.policy.max_attempts(),
        delay_ms = settings.policy.delay().as_millis(),
        "login settings resolved"
    );

    let jar = Arc::new(Jar::default());
    let client = HttpClient::with_cookie_jar_and_timeouts(
        Arc::clone(&jar),
        settings.connect_timeout_secs,
        settings.request_timeout_secs,
    )
    .context("failed to build HTTP client")?;

    let root = Context::background();
    let ctx = match settings.deadline {
        Some(deadline) => root.with_timeout(deadline),
        None => root.with_cancel(),
    };

    let interrupt = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling login");
                ctx.cancel();
            }
        })
    };

    let result = retry_login_with_policy(
        &settings.policy,
        &ctx,
        &client,
        &settings.target,
        &settings.credentials,
    )
    .await;
    interrupt.abort();
    result.context("login failed")?;

    let session_cookies = cookie_names(&jar, settings.target.login_url());
    info!(cookies = session_cookies.len(), "session acquired");

    let report = LoginReport {
        login_url: settings.target.login_url().to_string(),
        session_cookies,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.session_cookies.is_empty() {
        println!(
            "Logged in to {} (no session cookie was set)",
            report.login_url
        );
    } else {
        println!(
            "Logged in to {}; session cookies: {}",
            report.login_url,
            report.session_cookies.join(", ")
        );
    }
    Ok(())
}

/// Names of the cookies the jar would send to `url`. Values are never printed.
fn cookie_names(jar: &Jar, url: &str) -> Vec<String> {
    let Ok(url) = reqwest::Url::parse(url) else {
        return Vec::new();
    };
    let Some(header) = jar.cookies(&url) else {
        return Vec::new();
    };
    header
        .to_str()
        .unwrap_or_default()
        .split(';')
        .filter_map(|pair| pair.split('=').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

// ==================== status ====================

#[derive(Debug, Serialize)]
struct StatusReport {
    last_processed_date: Option<DateTime<Utc>>,
}

async fn run_status(args: &StatusArgs, file: &FileConfig) -> Result<()> {
    let path = args
        .database
        .clone()
        .or_else(|| file.database.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
    let db = open_database(&path).await?;
    let outcome = apply_status_action(&StatusRepository::new(db.clone()), &args.action).await;
    db.close().await;
    outcome
}

async fn apply_status_action(repo: &StatusRepository, action: &StatusAction) -> Result<()> {
    match action {
        StatusAction::Get { json } => {
            let report = StatusReport {
                last_processed_date: repo.last_processed_date().await?,
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match report.last_processed_date {
                    Some(date) => println!("{}", date.to_rfc3339()),
                    None => println!("No processed date recorded"),
                }
            }
        }
        StatusAction::Set { date } => {
            let date = parse_processed_date(date)?;
            repo.save_processed_date(date).await?;
            info!(date = %date.to_rfc3339(), "last processed date saved");
        }
    }
    Ok(())
}

async fn open_database(path: &Path) -> Result<Database> {
    if path == Path::new(IN_MEMORY_DATABASE) {
        return Ok(Database::new_in_memory().await?);
    }
    Database::new(path)
        .await
        .with_context(|| format!("failed to open status database '{}'", path.display()))
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_processed_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day.and_time(NaiveTime::MIN).and_utc());
    }
    bail!("Invalid date '{raw}': expected RFC 3339 (2024-03-15T12:00:00Z) or YYYY-MM-DD")
}
