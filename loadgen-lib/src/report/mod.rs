//! Streaming aggregation and reporting of iteration results.

use std::time::Duration;

use rama::telemetry::tracing;

use crate::iteration::IterationResult;

mod human;
mod json;
mod summary;

pub use self::{
    human::HumanReporter,
    json::JsonlReporter,
    summary::{Counters, LATENCY_BUCKETS_SECS, LatencyHistogram, Summary},
};

/// Consumer of iteration results.
///
/// `on_tick` is driven by the caller with the time elapsed since the run started;
/// implementations decide themselves whether an interval report is due.
pub trait Reporter: Send + 'static {
    fn on_result(&mut self, result: &IterationResult);
    fn on_tick(&mut self, now: Duration);
    fn finish(&mut self);
}

fn log_write_err(result: std::io::Result<()>) {
    if let Err(err) = result {
        tracing::warn!("failed to write report line: {err}");
    }
}

fn millis(d: Option<Duration>) -> Option<f64> {
    d.map(|d| d.as_secs_f64() * 1000.)
}

#[cfg(test)]
fn test_result(
    latency_ms: u64,
    failure: Option<crate::iteration::FailureKind>,
) -> IterationResult {
    use rama::http::StatusCode;

    use crate::iteration::FailureKind;

    let status = match failure {
        None => Some(StatusCode::OK),
        Some(FailureKind::HttpStatus) => Some(StatusCode::INTERNAL_SERVER_ERROR),
        Some(_) => None,
    };
    IterationResult {
        ts: std::time::SystemTime::now(),
        started: tokio::time::Instant::now(),
        latency: Duration::from_millis(latency_ms),
        status,
        failure,
        error: failure.map(|kind| kind.to_string()),
    }
}
