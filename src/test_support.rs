//! In-memory transports for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

use crate::transport::{BoxError, Transport, TransportResponse};

/// What a [`ScriptedTransport`] does on each call.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// Respond immediately with this status and an empty body.
    Respond(u16),
    /// Fail at the transport level with this message.
    Fail(&'static str),
    /// Respond with this status but a body that errors on first read.
    UnreadableBody(u16),
    /// Wait, then respond with the status.
    Delayed(Duration, u16),
}

/// Transport that plays back a script and counts calls.
///
/// A single script repeats forever; [`ScriptedTransport::sequence`] plays its
/// entries in order and then repeats the last one.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<Vec<Script>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Script) -> Self {
        Self::sequence(vec![script])
    }

    pub(crate) fn sequence(scripts: Vec<Script>) -> Self {
        assert!(!scripts.is_empty(), "script sequence must not be empty");
        Self {
            scripts: Mutex::new(scripts),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_script(&self) -> Script {
        let mut scripts = self
            .scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if scripts.len() > 1 {
            scripts.remove(0)
        } else {
            scripts[0]
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, _request: reqwest::Request) -> Result<TransportResponse, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_script() {
            Script::Respond(code) => Ok(TransportResponse::from_bytes(status(code), "")),
            Script::Fail(message) => Err(message.into()),
            Script::UnreadableBody(code) => {
                let chunk: Result<Bytes, BoxError> = Err("simulated read error".into());
                Ok(TransportResponse::new(
                    status(code),
                    futures_util::stream::iter([chunk]),
                ))
            }
            Script::Delayed(delay, code) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse::from_bytes(status(code), "ok"))
            }
        }
    }
}
