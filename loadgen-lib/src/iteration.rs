use std::time::{Duration, SystemTime};

use rama::{
    Service,
    error::BoxError,
    http::{Body, BodyExtractExt as _, Method, Request, Response, StatusCode},
    telemetry::tracing,
};
use serde::Serialize;
use tokio::time::Instant;

use crate::request::RequestSpec;

/// Why an iteration did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, DNS failure, reset or a broken response body.
    Transport,
    /// The request did not complete within the configured timeout.
    Timeout,
    /// A response was received, but its status is outside `200..400`.
    HttpStatus,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::HttpStatus => "http_status",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single iteration.
#[derive(Debug, Clone)]
pub struct IterationResult {
    /// Wall clock time at which the request was issued.
    pub ts: SystemTime,
    /// Monotonic time at which the request was issued.
    pub started: Instant,
    /// Time until the response (body included) was received, or the request failed.
    pub latency: Duration,
    /// Absent when no response was received.
    pub status: Option<StatusCode>,
    pub failure: Option<FailureKind>,
    /// Human readable failure reason.
    pub error: Option<String>,
}

impl IterationResult {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Issue exactly one GET for `spec` and record what happened.
///
/// Failures never escape this function: they end up in the returned result.
pub async fn run_iteration<S>(
    client: &S,
    spec: &RequestSpec,
    timeout: Option<Duration>,
) -> IterationResult
where
    S: Service<Request, Output = Response, Error: Into<BoxError>>,
{
    let ts = SystemTime::now();
    let started = Instant::now();

    let mut req = Request::new(Body::empty());
    *req.method_mut() = Method::GET;
    *req.uri_mut() = spec.target_uri().clone();
    *req.headers_mut() = spec.headers().clone();

    let exchange = async {
        let resp = client.serve(req).await.map_err(Into::into)?;
        let status = resp.status();
        // drain the body so it counts towards latency
        if let Err(err) = resp.try_into_string().await {
            return Ok::<_, BoxError>((status, Some(err.to_string())));
        }
        Ok::<_, BoxError>((status, None))
    };

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| limit),
        None => Ok(exchange.await),
    };
    let latency = started.elapsed();

    let (status, failure, error) = match outcome {
        Err(limit) => (
            None,
            Some(FailureKind::Timeout),
            Some(format!("request timed out after {limit:?}")),
        ),
        Ok(Err(err)) => (None, Some(FailureKind::Transport), Some(err.to_string())),
        Ok(Ok((status, Some(body_err)))) => (
            Some(status),
            Some(FailureKind::Transport),
            Some(format!("read response body: {body_err}")),
        ),
        Ok(Ok((status, None))) if is_success(status) => (Some(status), None, None),
        Ok(Ok((status, None))) => (
            Some(status),
            Some(FailureKind::HttpStatus),
            Some(format!("unexpected http status: {status}")),
        ),
    };

    match &error {
        Some(error) => tracing::debug!(
            uri = %spec.target_uri(),
            ?latency,
            ?status,
            "iteration failed: {error}"
        ),
        None => tracing::trace!(uri = %spec.target_uri(), ?latency, ?status, "iteration ok"),
    }

    IterationResult {
        ts,
        started,
        latency,
        status,
        failure,
        error,
    }
}

fn is_success(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}
