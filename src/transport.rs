//! HTTP transport used by the login flow.
//!
//! The login code never talks to `reqwest` directly. It hands a prepared
//! [`reqwest::Request`] to a [`Transport`] and gets back a status code and a
//! fallible body stream. [`HttpClient`] (and bare [`reqwest::Client`]) are the
//! production implementations; tests plug in their own to simulate failures
//! a real server cannot produce on demand.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use reqwest::cookie::Jar;
//! use scraper_session::HttpClient;
//!
//! # fn example() -> Result<(), reqwest::Error> {
//! let jar = Arc::new(Jar::default());
//! let client = HttpClient::with_cookie_jar(jar.clone())?;
//! // Pass `&client` to `retry_login`; `jar` holds the session afterwards.
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::instrument;

use crate::user_agent;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default overall request timeout (30 seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Boxed error carried as the cause of transport and body failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stream of body chunks, each of which may fail mid-read.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Executes one prepared request.
///
/// Implementations must not retry, and must not interpret the status code:
/// classification belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response head plus its body stream.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error for connection-level failures
    /// (DNS, refused connection, TLS, client-side timeouts).
    async fn execute(&self, request: reqwest::Request) -> Result<TransportResponse, BoxError>;
}

/// Response head and body as seen by the login flow.
pub struct TransportResponse {
    status: StatusCode,
    body: BodyStream,
}

impl TransportResponse {
    /// Creates a response from a status and an arbitrary body stream.
    pub fn new<S>(status: StatusCode, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self {
            status,
            body: Box::pin(body),
        }
    }

    /// Creates a response whose body is already fully available.
    #[must_use]
    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let chunk: Result<Bytes, BoxError> = Ok(body.into());
        Self::new(status, futures_util::stream::iter([chunk]))
    }

    /// HTTP status code of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Consumes the response and returns its body stream.
    #[must_use]
    pub fn into_body(self) -> BodyStream {
        self.body
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl From<reqwest::Response> for TransportResponse {
    fn from(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.bytes_stream().map_err(|e| Box::new(e) as BoxError);
        Self::new(status, body)
    }
}

#[async_trait]
impl Transport for Client {
    async fn execute(&self, request: reqwest::Request) -> Result<TransportResponse, BoxError> {
        let response = Client::execute(self, request)
            .await
            .map_err(BoxError::from)?;
        Ok(TransportResponse::from(response))
    }
}

/// `reqwest` client configured for talking to a login portal.
///
/// Create it once per session and share it across attempts: connection
/// pooling and the cookie jar both live inside it.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client without a cookie store.
    ///
    /// Logging in through such a client proves the credentials but keeps no
    /// session afterwards.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the TLS backend fails to initialize.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::build(None, CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS)
    }

    /// Creates a client that stores cookies in `cookie_jar`.
    ///
    /// `Set-Cookie` headers from the login response land in the jar and are
    /// attached to every later request that matches their domain and path.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the TLS backend fails to initialize.
    #[instrument(level = "debug", skip(cookie_jar))]
    pub fn with_cookie_jar(cookie_jar: Arc<Jar>) -> Result<Self, reqwest::Error> {
        Self::build(Some(cookie_jar), CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS)
    }

    /// Creates a client with a cookie jar and explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the TLS backend fails to initialize.
    #[instrument(level = "debug", skip(cookie_jar))]
    pub fn with_cookie_jar_and_timeouts(
        cookie_jar: Arc<Jar>,
        connect_timeout_secs: u64,
        request_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        Self::build(Some(cookie_jar), connect_timeout_secs, request_timeout_secs)
    }

    fn build(
        cookie_jar: Option<Arc<Jar>>,
        connect_timeout_secs: u64,
        request_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = base_client_builder(cookie_jar, connect_timeout_secs, request_timeout_secs)
            .build()?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// The scraper uses this for its own requests once the session exists.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: reqwest::Request) -> Result<TransportResponse, BoxError> {
        Transport::execute(&self.client, request).await
    }
}

fn base_client_builder(
    cookie_jar: Option<Arc<Jar>>,
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(request_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::LOGIN_USER_AGENT);
    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(jar);
    }
    builder
}

/// Drains a body stream into memory.
///
/// # Errors
///
/// Returns the first chunk error; bytes read before it are discarded.
pub async fn read_body(mut body: BodyStream) -> Result<Bytes, BoxError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(Bytes::from(buffer))
}
