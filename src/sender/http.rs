use super::transport::{Transport, TransportError};
use crate::domain::Batch;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Body, Method, Request, StatusCode, Url};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Closed taxonomy for one delivery attempt. `Timeout` and `Canceled` are
/// kept distinct from `Failed` for diagnosability.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to send batch: {0}")]
    Failed(String),
    #[error("send timed out")]
    Timeout,
    #[error("send canceled")]
    Canceled,
}

/// Synchronously delivers batches to one HTTP endpoint.
///
/// Deliveries on the same instance are mutually exclusive even when invoked
/// from concurrent callers; a batch is never partially sent.
pub struct HttpSender<T: Transport> {
    transport: T,
    url: Url,
    guard: Mutex<()>,
}

impl<T: Transport> HttpSender<T> {
    pub fn new(transport: T, endpoint: &str) -> Result<Self, SendError> {
        let url = endpoint
            .parse::<Url>()
            .map_err(|err| SendError::InvalidRequest(format!("malformed endpoint '{endpoint}': {err}")))?;
        Ok(Self {
            transport,
            url,
            guard: Mutex::new(()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.url
    }

    /// Delivers exactly one batch: serialize, POST, map the outcome.
    ///
    /// Exactly one transport call is made per invocation; any status other
    /// than 200 is a failure regardless of the response body. Cancellation
    /// is cooperative: once the exchange is past the point of no return it
    /// completes before the token takes effect.
    pub async fn deliver(
        &self,
        batch: &Batch,
        shutdown: &CancellationToken,
    ) -> Result<(), SendError> {
        let _exclusive = self.guard.lock().await;

        let body = serde_json::to_vec(batch)
            .map_err(|err| SendError::InvalidRequest(format!("serialize batch: {err}")))?;

        let mut request = Request::new(Method::POST, self.url.clone());
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(Body::from(body));

        let exchange = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(SendError::Canceled),
            exchange = self.transport.execute(request) => exchange,
        };

        let response = exchange.map_err(|err| match err {
            TransportError::Timeout => SendError::Timeout,
            TransportError::Transport(message) => SendError::Failed(message),
        })?;

        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(SendError::Failed(format!(
                "unexpected status: {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Batch, LogEntry, LogLevel};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ENDPOINT: &str = "https://api.example.com/logs";

    fn response_with_status(status: u16) -> reqwest::Response {
        let response = ::http::Response::builder()
            .status(status)
            .body("{}")
            .unwrap();
        reqwest::Response::from(response)
    }

    /// Double that records every request and answers with a fixed status.
    struct FixedStatusTransport {
        status: u16,
        calls: Arc<AtomicUsize>,
    }

    impl FixedStatusTransport {
        fn new(status: u16) -> Self {
            Self {
                status,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Transport for FixedStatusTransport {
        fn execute(
            &self,
            request: Request,
        ) -> impl Future<Output = Result<reqwest::Response, TransportError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self.status;
            assert_eq!(request.method(), Method::POST);
            assert_eq!(
                request.headers().get(CONTENT_TYPE).unwrap(),
                "application/json"
            );
            async move { Ok(response_with_status(status)) }
        }
    }

    /// Double that fails every exchange at the transport level.
    struct FailingTransport {
        error_is_timeout: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Transport for FailingTransport {
        fn execute(
            &self,
            _request: Request,
        ) -> impl Future<Output = Result<reqwest::Response, TransportError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let err = if self.error_is_timeout {
                TransportError::Timeout
            } else {
                TransportError::Transport("connection refused".to_string())
            };
            async move { Err(err) }
        }
    }

    /// Double whose exchange never completes.
    struct StalledTransport;

    impl Transport for StalledTransport {
        fn execute(
            &self,
            _request: Request,
        ) -> impl Future<Output = Result<reqwest::Response, TransportError>> + Send {
            std::future::pending()
        }
    }

    fn sample_batch() -> Batch {
        Batch::single(
            "test-token",
            LogEntry::new(Utc::now(), LogLevel::Info, "test log message", HashMap::new()),
        )
    }

    #[tokio::test]
    async fn delivers_batch_with_single_call_on_200() {
        let transport = FixedStatusTransport::new(200);
        let calls = transport.calls.clone();
        let sender = HttpSender::new(transport, ENDPOINT).unwrap();

        let result = sender
            .deliver(&sample_batch(), &CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_batch_still_performs_exactly_one_call() {
        let transport = FixedStatusTransport::new(200);
        let calls = transport.calls.clone();
        let sender = HttpSender::new(transport, ENDPOINT).unwrap();

        let batch = Batch::new("test-token", Vec::new());
        let result = sender.deliver(&batch, &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_200_status_maps_to_failed_without_retry() {
        let transport = FixedStatusTransport::new(503);
        let calls = transport.calls.clone();
        let sender = HttpSender::new(transport, ENDPOINT).unwrap();

        let result = sender
            .deliver(&sample_batch(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SendError::Failed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accepted_status_other_than_200_is_still_failed() {
        let transport = FixedStatusTransport::new(202);
        let sender = HttpSender::new(transport, ENDPOINT).unwrap();

        let result = sender
            .deliver(&sample_batch(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SendError::Failed(_))));
    }

    #[tokio::test]
    async fn transport_error_maps_to_failed() {
        let transport = FailingTransport {
            error_is_timeout: false,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let sender = HttpSender::new(transport, ENDPOINT).unwrap();

        let result = sender
            .deliver(&sample_batch(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SendError::Failed(_))));
    }

    #[tokio::test]
    async fn transport_timeout_maps_to_timeout() {
        let transport = FailingTransport {
            error_is_timeout: true,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let sender = HttpSender::new(transport, ENDPOINT).unwrap();

        let result = sender
            .deliver(&sample_batch(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SendError::Timeout)));
    }

    #[tokio::test]
    async fn cancellation_during_stalled_exchange_returns_canceled() {
        let sender = HttpSender::new(StalledTransport, ENDPOINT).unwrap();
        let shutdown = CancellationToken::new();

        let cancel_after = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_after.cancel();
        });

        let result = sender.deliver(&sample_batch(), &shutdown).await;
        assert!(matches!(result, Err(SendError::Canceled)));
    }

    #[tokio::test]
    async fn malformed_endpoint_is_invalid_request() {
        let result = HttpSender::new(FixedStatusTransport::new(200), "not a url");
        assert!(matches!(result, Err(SendError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn concurrent_deliveries_are_serialized_one_call_each() {
        let transport = FixedStatusTransport::new(200);
        let calls = transport.calls.clone();
        let sender = Arc::new(HttpSender::new(transport, ENDPOINT).unwrap());
        let shutdown = CancellationToken::new();

        let deliveries = (0..10).map(|_| {
            let sender = sender.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                sender
                    .deliver(&Batch::new("test-token", Vec::new()), &shutdown)
                    .await
            })
        });

        for outcome in futures::future::join_all(deliveries).await {
            assert!(outcome.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }
}
