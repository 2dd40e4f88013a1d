//! Bounded, cancellation-aware retries around [`login`].
//!
//! The portal is a single known endpoint. Failures are usually transient
//! load or a short lockout after a rejected login, so the delay between
//! attempts is fixed rather than exponential.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use reqwest::cookie::Jar;
//! use scraper_session::{Context, Credentials, HttpClient, SessionTarget, retry_login};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let jar = Arc::new(Jar::default());
//! let client = HttpClient::with_cookie_jar(jar)?;
//! let target = SessionTarget::new("https://portal.example/login.php", "https://portal.example/");
//! let credentials = Credentials::new("operator", "hunter2");
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(60));
//! retry_login(&ctx, &client, &target, &credentials).await?;
//! # Ok(())
//! # }
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use super::credentials::{Credentials, SessionTarget};
use super::error::LoginError;
use super::login::{LoginOutcome, login};
use crate::context::Context;
use crate::metrics;
use crate::transport::Transport;

/// Default maximum login attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between login attempts (5 seconds).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Attempt budget and fixed delay for [`retry_login_with_policy`].
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `delay`: 5 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Pause between a failed attempt and the next one.
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` below 1 is raised to 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Creates a policy with a custom `max_attempts` and the default delay.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, DEFAULT_RETRY_DELAY)
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Logs in with the default [`RetryPolicy`].
///
/// # Errors
///
/// See [`retry_login_with_policy`].
pub async fn retry_login<T>(
    ctx: &Context,
    client: &T,
    target: &SessionTarget,
    credentials: &Credentials,
) -> Result<(), LoginError>
where
    T: Transport + ?Sized,
{
    retry_login_with_policy(&RetryPolicy::default(), ctx, client, target, credentials).await
}

/// Logs in, retrying failed attempts up to the policy's budget.
///
/// Attempts run strictly one after another on the shared `client`, so any
/// cookies a failed attempt received are sent with the next one. Each
/// failure is logged at `warn` with its attempt number; the caller only sees
/// the terminal error.
///
/// # Errors
///
/// - The attempt's own error if it was caused by `ctx` finishing mid-request
/// - [`LoginError::Interrupted`] if `ctx` finished between attempts or
///   during the delay
/// - [`LoginError::RetryExhausted`] wrapping the last attempt's error once
///   the budget is spent
#[instrument(
    skip_all,
    fields(login_url = %target.login_url(), max_attempts = policy.max_attempts())
)]
pub async fn retry_login_with_policy<T>(
    policy: &RetryPolicy,
    ctx: &Context,
    client: &T,
    target: &SessionTarget,
    credentials: &Credentials,
) -> Result<(), LoginError>
where
    T: Transport + ?Sized,
{
    let max_attempts = policy.max_attempts();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        if attempt > 1
            && let Some(ctx_error) = ctx.err()
        {
            debug!(attempt, error = %ctx_error, "context finished before attempt");
            return Err(LoginError::interrupted(attempt, ctx_error));
        }

        let started = Instant::now();
        let result = login(ctx, client, target, credentials).await;
        metrics::record_login_attempt(LoginOutcome::classify(&result), started.elapsed());

        let error = match result {
            Ok(()) => {
                info!(attempt, "login succeeded");
                return Ok(());
            }
            Err(error) => error,
        };

        if let Some(ctx_error) = error.context_error() {
            debug!(attempt, error = %ctx_error, "login attempt cut short by context");
            return Err(error);
        }

        warn!(attempt, max_attempts, error = %error, "login attempt failed");

        if attempt >= max_attempts {
            return Err(LoginError::retry_exhausted(attempt, error));
        }

        if let Err(ctx_error) = ctx.sleep(policy.delay()).await {
            debug!(attempt, error = %ctx_error, "context finished during retry delay");
            return Err(LoginError::interrupted(attempt + 1, ctx_error));
        }
    }
}
