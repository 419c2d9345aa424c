use std::{io::Write, time::Duration};

use tokio::time::Instant;

use super::{Counters, Reporter, Summary, log_write_err, millis};
use crate::iteration::IterationResult;

/// JSON lines: optional per-iteration events, interval summaries and a final summary.
pub struct JsonlReporter<W> {
    out: W,
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    total: Summary,
    first_start: Option<Instant>,
    emit_events: bool,
}

impl<W: Write + Send + 'static> JsonlReporter<W> {
    pub fn new(out: W, interval: Duration, emit_events: bool) -> Self {
        Self {
            out,
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            total: Summary::default(),
            first_start: None,
            emit_events,
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.total
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: serde_json::Value) {
        log_write_err(writeln!(self.out, "{line}"));
    }
}

fn counters_json(c: &Counters) -> serde_json::Value {
    serde_json::json!({
        "total": c.total,
        "ok": c.ok,
        "http_fail": c.http_fail,
        "transport_fail": c.transport_fail,
        "timeout_fail": c.timeout_fail,
    })
}

impl<W: Write + Send + 'static> Reporter for JsonlReporter<W> {
    fn on_result(&mut self, result: &IterationResult) {
        self.interval_counts.record(result);
        self.total.record(result);

        if self.emit_events {
            let first_start = *self.first_start.get_or_insert(result.started);
            let ts_ms = result
                .ts
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();

            let line = serde_json::json!({
                "type": "event",
                "index": self.total.counters.total - 1,
                "ts_ms": ts_ms,
                "t_ms": result.started.saturating_duration_since(first_start).as_millis(),
                "latency_ms": millis(Some(result.latency)),
                "ok": result.is_ok(),
                "status": result.status.map(|s| s.as_u16()),
                "failure": result.failure,
                "error": result.error,
            });
            self.emit(line);
        }
    }

    fn on_tick(&mut self, now: Duration) {
        if now.saturating_sub(self.last_tick) < self.interval {
            return;
        }
        let elapsed = now - self.last_tick;
        self.last_tick = now;

        let secs = elapsed.as_secs_f64();
        let rps = if secs == 0. {
            0.
        } else {
            self.interval_counts.total as f64 / secs
        };

        let line = serde_json::json!({
            "type": "summary",
            "t_ms": now.as_millis(),
            "interval_ms": elapsed.as_millis(),
            "rps": rps,
            "interval": counters_json(&self.interval_counts),
            "total": counters_json(&self.total.counters),
        });
        self.emit(line);

        self.interval_counts = Counters::default();
    }

    fn finish(&mut self) {
        let line = serde_json::json!({
            "type": "final",
            "total": counters_json(&self.total.counters),
            "error_ratio": self.total.counters.error_ratio(),
            "availability": self.total.counters.availability(),
            "latency_ms": {
                "min": millis(self.total.latency.min()),
                "mean": millis(self.total.latency.mean()),
                "p50": millis(self.total.p50()),
                "p90": millis(self.total.p90()),
                "p99": millis(self.total.p99()),
                "max": millis(self.total.latency.max()),
            },
        });
        self.emit(line);
        log_write_err(self.out.flush());
    }
}
