//! Session acquisition through the portal's login form.
//!
//! [`login`] performs exactly one form POST and classifies the result.
//! [`retry_login`] wraps it in a bounded loop with a fixed delay that stops
//! early when the [`Context`](crate::Context) is cancelled or its deadline
//! passes. On success the caller's cookie jar holds the session.

mod credentials;
mod error;
mod login;
mod retry;

pub use credentials::{Credentials, SessionTarget};
pub use error::{LoginError, LoginErrorKind, LoginFailed, RequestBuildError};
pub use login::{FORM_CONTENT_TYPE, LoginOutcome, build_login_request, login};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy, retry_login, retry_login_with_policy,
};
