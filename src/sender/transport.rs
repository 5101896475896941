use reqwest::{Client, Request, Response};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure, classified by inspecting the underlying client
/// error rather than by string matching.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Capability for performing one HTTP exchange.
///
/// The sender makes exactly one `execute` call per delivery; test doubles
/// implement this to count calls, fail, or stall.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

/// Real transport backed by a pooled `reqwest` client with a request
/// deadline.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        let pending = self.client.execute(request);
        async move { pending.await.map_err(TransportError::from) }
    }
}
