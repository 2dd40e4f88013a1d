//! One login exchange and its classification.

use reqwest::header::{CONTENT_TYPE, HeaderValue, REFERER, USER_AGENT};
use reqwest::{Method, StatusCode, Url};

use super::credentials::{Credentials, SessionTarget};
use super::error::{LoginError, RequestBuildError};
use crate::context::Context;
use crate::transport::{Transport, read_body};
use crate::user_agent::LOGIN_USER_AGENT;

/// Content type of the login form body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Classification of a single login attempt.
///
/// The cause of a failure stays on the [`LoginError`]; this enum is the
/// category only, suitable for metric labels and equality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Status 200 and the body was read to the end.
    Success,
    /// Connection-level failure, including cancellation while in flight.
    TransportFailure,
    /// The server answered with a status other than 200.
    UnexpectedStatus(u16),
    /// The body failed mid-read.
    BodyReadFailure,
    /// The request could not be built.
    RequestConstructionFailure,
    /// The context finished between attempts, so no attempt ran.
    Interrupted,
}

impl LoginOutcome {
    /// Classifies the result of [`login`].
    ///
    /// An exhausted retry reports its last attempt's category. An
    /// interruption only comes out of the retry loop and has its own
    /// category; a single [`login`] never produces it.
    #[must_use]
    pub fn classify(result: &Result<(), LoginError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(error) => Self::from_error(error),
        }
    }

    fn from_error(error: &LoginError) -> Self {
        match error {
            LoginError::RequestConstruction { .. } => Self::RequestConstructionFailure,
            LoginError::Transport { .. } => Self::TransportFailure,
            LoginError::Interrupted { .. } => Self::Interrupted,
            LoginError::UnexpectedStatus { status, .. } => Self::UnexpectedStatus(*status),
            LoginError::BodyRead { .. } => Self::BodyReadFailure,
            LoginError::RetryExhausted { source, .. } => Self::from_error(source),
        }
    }

    /// Stable label for metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::TransportFailure => "transport_failure",
            Self::UnexpectedStatus(_) => "unexpected_status",
            Self::BodyReadFailure => "body_read_failure",
            Self::RequestConstructionFailure => "request_construction_failure",
            Self::Interrupted => "interrupted",
        }
    }

    /// True for [`LoginOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Performs exactly one login exchange.
///
/// Posts `action=login&username=..&password=..` to the target's login URL
/// and treats status 200 with a fully readable body as an authenticated
/// session. The session itself is whatever the server put into the client's
/// cookie jar along the way; the body is drained but not interpreted.
///
/// Both the exchange and the body read are raced against `ctx`. This
/// function never retries, sleeps or logs.
///
/// # Errors
///
/// - [`LoginError::RequestConstruction`] if the request cannot be built
///   (nothing is sent)
/// - [`LoginError::Transport`] on connection failures or when `ctx`
///   finishes before the response arrives
/// - [`LoginError::BodyRead`] if the body fails mid-read
/// - [`LoginError::UnexpectedStatus`] if the status is not 200
pub async fn login<T>(
    ctx: &Context,
    client: &T,
    target: &SessionTarget,
    credentials: &Credentials,
) -> Result<(), LoginError>
where
    T: Transport + ?Sized,
{
    let request =
        build_login_request(target, credentials).map_err(LoginError::request_construction)?;

    let response = match ctx.run(client.execute(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => return Err(LoginError::transport(error)),
        Err(ctx_error) => return Err(LoginError::transport(ctx_error)),
    };

    let status = response.status();
    match ctx.run(read_body(response.into_body())).await {
        Ok(Ok(_)) => {}
        Ok(Err(error)) => return Err(LoginError::body_read(error)),
        Err(ctx_error) => return Err(LoginError::body_read(ctx_error)),
    }

    if status != StatusCode::OK {
        return Err(LoginError::unexpected_status(status.as_u16()));
    }

    Ok(())
}

/// Builds the login POST without sending it.
///
/// # Errors
///
/// Returns [`RequestBuildError`] if the login URL is not an absolute
/// HTTP(S) URL or the base URL cannot be used as a header value.
pub fn build_login_request(
    target: &SessionTarget,
    credentials: &Credentials,
) -> Result<reqwest::Request, RequestBuildError> {
    let url = Url::parse(target.login_url()).map_err(|source| RequestBuildError::InvalidUrl {
        url: target.login_url().to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RequestBuildError::UnsupportedScheme {
            url: target.login_url().to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    let referer = HeaderValue::from_str(target.base_url())
        .map_err(|source| RequestBuildError::InvalidReferer { source })?;

    let mut request = reqwest::Request::new(Method::POST, url);
    let headers = request.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    headers.insert(USER_AGENT, HeaderValue::from_static(LOGIN_USER_AGENT));
    headers.insert(REFERER, referer);
    *request.body_mut() = Some(encode_login_form(credentials).into());

    Ok(request)
}

/// Encodes the login form, fields in the order the portal's own form sends them.
fn encode_login_form(credentials: &Credentials) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("action", "login")
        .append_pair("username", credentials.username())
        .append_pair("password", credentials.password())
        .finish()
}
