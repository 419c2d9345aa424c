use std::{io::Write, time::Duration};

use super::{Counters, Reporter, Summary, log_write_err, millis};
use crate::iteration::IterationResult;

/// Plain text lines: one per interval, plus a final summary.
pub struct HumanReporter<W> {
    out: W,
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    total: Summary,
}

impl<W: Write + Send + 'static> HumanReporter<W> {
    pub fn new(out: W, interval: Duration) -> Self {
        Self {
            out,
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            total: Summary::default(),
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.total
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> Reporter for HumanReporter<W> {
    fn on_result(&mut self, result: &IterationResult) {
        self.interval_counts.record(result);
        self.total.record(result);
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
        let c = self.interval_counts;

        log_write_err(writeln!(
            self.out,
            "t={:.1}s rps={:.1} ok={} http_fail={} transport_fail={} timeout_fail={} total_ok={} total_fail={}",
            now.as_secs_f64(),
            rps,
            c.ok,
            c.http_fail,
            c.transport_fail,
            c.timeout_fail,
            self.total.counters.ok,
            self.total.counters.failures(),
        ));

        self.interval_counts = Counters::default();
    }

    fn finish(&mut self) {
        let c = self.total.counters;
        let ms = |d| millis(d).unwrap_or_default();

        log_write_err(writeln!(
            self.out,
            "done total={} ok={} http_fail={} transport_fail={} timeout_fail={} error_ratio={:.4} p50={:.1}ms p90={:.1}ms p99={:.1}ms max={:.1}ms",
            c.total,
            c.ok,
            c.http_fail,
            c.transport_fail,
            c.timeout_fail,
            c.error_ratio(),
            ms(self.total.p50()),
            ms(self.total.p90()),
            ms(self.total.p99()),
            ms(self.total.latency.max()),
        ));
        log_write_err(self.out.flush());
    }
}
