//! Cancellation and deadline propagation for suspending operations.
//!
//! A [`Context`] pairs a [`CancellationToken`] with an optional deadline.
//! Every suspension point in the login flow (the network exchange, the body
//! read, the delay between attempts) is raced against [`Context::done`], so
//! cancellation takes effect while the operation is waiting rather than at
//! the next loop boundary.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use scraper_session::{Context, ContextError};
//!
//! # async fn example() {
//! let ctx = Context::background().with_timeout(Duration::from_millis(10));
//! let result = ctx.sleep(Duration::from_secs(5)).await;
//! assert_eq!(result, Err(ContextError::DeadlineExceeded));
//! # }
//! ```

use std::error::Error;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a [`Context`] finished.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context (or one of its parents) was cancelled explicitly.
    #[error("context canceled")]
    Canceled,

    /// The context deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellable, deadline-bearing execution context.
///
/// Cloning shares the same token: cancelling any clone cancels all of them.
/// Derived contexts (`with_*`) get a child token, so cancelling a child never
/// affects its parent.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: never cancelled unless [`cancel`](Self::cancel) is called, no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a child that can be cancelled independently of the parent.
    #[must_use]
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derives a child that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant adds no deadline of its own.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Derives a child that expires at `deadline`, or earlier if the parent does.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the effective deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        if let Some(err) = self.err() {
            return err;
        }
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => ContextError::Canceled,
                () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Runs `operation` until it completes or the context finishes.
    ///
    /// The context is polled first, so an already finished context never
    /// polls `operation` at all. When the context wins, `operation` is
    /// dropped, which aborts whatever it had in flight.
    ///
    /// # Errors
    ///
    /// Returns the [`ContextError`] if the context finished first.
    pub async fn run<F>(&self, operation: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = operation => Ok(output),
        }
    }

    /// Sleeps for `duration` unless the context finishes first.
    ///
    /// # Errors
    ///
    /// Returns the [`ContextError`] if the context finished during the sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        self.run(tokio::time::sleep(duration)).await
    }
}

/// Walks `error` and its `source()` chain looking for a value equal to `target`.
///
/// Category checks should go through this (or the typed predicates built on
/// it) instead of matching on message text.
pub fn error_chain_contains<E>(error: &(dyn Error + 'static), target: &E) -> bool
where
    E: Error + PartialEq + 'static,
{
    let mut current = Some(error);
    while let Some(err) = current {
        if err.downcast_ref::<E>().is_some_and(|found| found == target) {
            return true;
        }
        current = err.source();
    }
    false
}
