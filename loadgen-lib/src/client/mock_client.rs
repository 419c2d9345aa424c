use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use rama::{
    Service,
    error::BoxError,
    http::{
        HeaderMap, Method, Request, Response, StatusCode, Uri,
        service::web::response::{IntoResponse, Json},
    },
};
use serde::Deserialize;

/// How the mock target reacts to every request it receives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MockBehaviour {
    /// Serve `/work` and `/healthz` like the real target.
    #[default]
    Serve,
    /// Fail every request before any response is produced.
    RefuseConnection,
    /// Never answer.
    Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// In-process stand-in for the load target.
///
/// `/work` honours `latencyMs` (default 100) and `failRatePct` (default 0).
/// Failures are spread deterministically: exactly `failRatePct` out of
/// every 100 `/work` requests answer with a 500.
#[derive(Debug, Clone)]
pub struct MockTargetClient {
    inner: Arc<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    behaviour: MockBehaviour,
    requests: Mutex<Vec<RecordedRequest>>,
    work_served: AtomicU64,
}

impl MockTargetClient {
    pub fn new(behaviour: MockBehaviour) -> Self {
        Self {
            inner: Arc::new(MockState {
                behaviour,
                ..Default::default()
            }),
        }
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().clone()
    }

    async fn work(&self, uri: &Uri) -> Response {
        let query: WorkQuery = match serde_html_form::from_str(uri.query().unwrap_or_default()) {
            Ok(query) => query,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };

        tokio::time::sleep(Duration::from_millis(query.latency_ms)).await;

        let n = self.inner.work_served.fetch_add(1, Ordering::SeqCst);
        if is_simulated_failure(n, query.fail_rate_pct) {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "ok": false,
                    "error": "simulated",
                })),
            )
                .into_response();
        }

        Json(serde_json::json!({
            "ok": true,
            "latencyMs": query.latency_ms,
            "failRatePct": query.fail_rate_pct,
        }))
        .into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkQuery {
    #[serde(default = "default_latency_ms")]
    latency_ms: u64,
    #[serde(default)]
    fail_rate_pct: u64,
}

fn default_latency_ms() -> u64 {
    100
}

fn is_simulated_failure(n: u64, fail_rate_pct: u64) -> bool {
    let pct = fail_rate_pct.min(100);
    (n + 1) * pct / 100 > n * pct / 100
}

impl Service<Request> for MockTargetClient {
    type Output = Response;
    type Error = BoxError;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        self.inner.requests.lock().push(RecordedRequest {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        });

        match self.inner.behaviour {
            MockBehaviour::Serve => (),
            MockBehaviour::RefuseConnection => {
                return Err(BoxError::from("mock target: connection refused"));
            }
            MockBehaviour::Hang => std::future::pending::<()>().await,
        }

        Ok(match req.uri().path() {
            "/work" => self.work(req.uri()).await,
            "/healthz" => "ok".into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_failure_spread() {
        for (pct, expected) in [(0, 0), (5, 5), (50, 50), (100, 100), (250, 100)] {
            let failures = (0..100).filter(|n| is_simulated_failure(*n, pct)).count();
            assert_eq!(failures, expected, "pct = {pct}");
        }
    }
}
