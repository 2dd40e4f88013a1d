//! Error types for the login flow.
//!
//! Every failure a caller may need to branch on has its own variant, and the
//! variants keep their causes in the `source()` chain. Callers test the
//! category with [`LoginError::kind`] or the `is_*` predicates, never by
//! parsing the message.

use thiserror::Error;

use crate::context::{ContextError, error_chain_contains};
use crate::transport::BoxError;

/// Sentinel marking a login the server refused.
///
/// Sits in the source chain of [`LoginError::UnexpectedStatus`] so that
/// "the portal rejected us" can be told apart from infrastructure trouble
/// even after the error has been wrapped by [`LoginError::RetryExhausted`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("login failed")]
pub struct LoginFailed;

/// Reasons the login request could not be assembled.
#[derive(Debug, Error)]
pub enum RequestBuildError {
    /// The login URL does not parse.
    #[error("invalid login URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The login URL parses but is not an HTTP(S) URL.
    #[error("unsupported scheme '{scheme}' in login URL '{url}'")]
    UnsupportedScheme { url: String, scheme: String },

    /// The base URL cannot be sent as a `Referer` header.
    #[error("base URL is not a valid Referer header value: {source}")]
    InvalidReferer {
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },
}

/// Errors returned by [`login`](super::login) and [`retry_login`](super::retry_login).
#[derive(Debug, Error)]
pub enum LoginError {
    /// The request could not be built; nothing was sent.
    #[error("failed to create new request: {source}")]
    RequestConstruction {
        #[source]
        source: RequestBuildError,
    },

    /// The exchange failed below HTTP, including context cancellation or
    /// deadline while the request was in flight.
    #[error("failed to request: {source}")]
    Transport {
        #[source]
        source: BoxError,
    },

    /// The server answered with something other than 200.
    #[error("{source}, status code: {status}")]
    UnexpectedStatus {
        status: u16,
        #[source]
        source: LoginFailed,
    },

    /// The response arrived but its body could not be read to the end.
    #[error("failed to read response body: {source}")]
    BodyRead {
        #[source]
        source: BoxError,
    },

    /// The context finished between attempts or during the retry delay.
    #[error("login interrupted before attempt {attempt}: {source}")]
    Interrupted {
        /// The attempt that was about to start (1-indexed).
        attempt: u32,
        #[source]
        source: ContextError,
    },

    /// Every attempt failed; holds the last attempt's error.
    #[error("failed to login after multiple retries ({attempts} attempts): {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<LoginError>,
    },
}

/// Category of a [`LoginError`], for branching without matching on fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginErrorKind {
    RequestConstruction,
    Transport,
    UnexpectedStatus,
    BodyRead,
    Interrupted,
    RetryExhausted,
}

impl LoginError {
    /// Creates a request construction error.
    pub fn request_construction(source: RequestBuildError) -> Self {
        Self::RequestConstruction { source }
    }

    /// Creates a transport error from any error type.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Transport {
            source: source.into(),
        }
    }

    /// Creates a rejected-login error for a non-200 status.
    pub fn unexpected_status(status: u16) -> Self {
        Self::UnexpectedStatus {
            status,
            source: LoginFailed,
        }
    }

    /// Creates a body read error from any error type.
    pub fn body_read(source: impl Into<BoxError>) -> Self {
        Self::BodyRead {
            source: source.into(),
        }
    }

    /// Creates an interruption error for the attempt about to start.
    pub fn interrupted(attempt: u32, source: ContextError) -> Self {
        Self::Interrupted { attempt, source }
    }

    /// Creates the terminal error after `attempts` failed attempts.
    pub fn retry_exhausted(attempts: u32, last: LoginError) -> Self {
        Self::RetryExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> LoginErrorKind {
        match self {
            Self::RequestConstruction { .. } => LoginErrorKind::RequestConstruction,
            Self::Transport { .. } => LoginErrorKind::Transport,
            Self::UnexpectedStatus { .. } => LoginErrorKind::UnexpectedStatus,
            Self::BodyRead { .. } => LoginErrorKind::BodyRead,
            Self::Interrupted { .. } => LoginErrorKind::Interrupted,
            Self::RetryExhausted { .. } => LoginErrorKind::RetryExhausted,
        }
    }

    /// Returns the HTTP status for a rejected login, looking through retry exhaustion.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::RetryExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Returns the last attempt's error when retries were exhausted.
    #[must_use]
    pub fn last_attempt_error(&self) -> Option<&LoginError> {
        match self {
            Self::RetryExhausted { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True if the server rejected the login somewhere in this error's chain.
    #[must_use]
    pub fn is_login_rejected(&self) -> bool {
        error_chain_contains(self, &LoginFailed)
    }

    /// True if the context was cancelled somewhere in this error's chain.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        error_chain_contains(self, &ContextError::Canceled)
    }

    /// True if the context deadline elapsed somewhere in this error's chain.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        error_chain_contains(self, &ContextError::DeadlineExceeded)
    }

    /// Returns the context error in this error's chain, if any.
    #[must_use]
    pub fn context_error(&self) -> Option<ContextError> {
        if self.is_canceled() {
            Some(ContextError::Canceled)
        } else if self.is_deadline_exceeded() {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }
}
