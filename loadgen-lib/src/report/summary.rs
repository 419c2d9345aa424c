use std::time::Duration;

use crate::iteration::{FailureKind, IterationResult};

/// Upper bounds (in seconds) of the latency histogram buckets,
/// from sub-10ms up to multi-second tails.
pub const LATENCY_BUCKETS_SECS: [f64; 13] = [
    0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.3, 0.5, 0.75, 1., 2., 5., 10.,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: u64,
    pub ok: u64,
    pub http_fail: u64,
    pub transport_fail: u64,
    pub timeout_fail: u64,
}

impl Counters {
    pub fn record(&mut self, result: &IterationResult) {
        self.total += 1;
        match result.failure {
            None => self.ok += 1,
            Some(FailureKind::HttpStatus) => self.http_fail += 1,
            Some(FailureKind::Transport) => self.transport_fail += 1,
            Some(FailureKind::Timeout) => self.timeout_fail += 1,
        }
    }

    pub fn failures(&self) -> u64 {
        self.total - self.ok
    }

    /// Failed iterations over all iterations, `0.0` when nothing ran yet.
    pub fn error_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.;
        }
        self.failures() as f64 / self.total as f64
    }

    pub fn availability(&self) -> f64 {
        1. - self.error_ratio()
    }
}

/// Fixed-bucket latency histogram.
///
/// Memory stays constant no matter how long a run lasts.
/// Quantiles are estimated by linear interpolation within the bucket
/// that holds the requested rank.
#[derive(Debug, Clone, Default)]
pub struct LatencyHistogram {
    // one extra bucket for everything above the last bound
    buckets: [u64; LATENCY_BUCKETS_SECS.len() + 1],
    count: u64,
    sum: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
}

impl LatencyHistogram {
    pub fn observe(&mut self, latency: Duration) {
        let secs = latency.as_secs_f64();
        let idx = LATENCY_BUCKETS_SECS
            .iter()
            .position(|bound| secs <= *bound)
            .unwrap_or(LATENCY_BUCKETS_SECS.len());
        self.buckets[idx] += 1;
        self.count += 1;
        self.sum += latency;
        self.min = Some(self.min.map_or(latency, |min| min.min(latency)));
        self.max = Some(self.max.map_or(latency, |max| max.max(latency)));
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> Option<Duration> {
        self.min
    }

    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    pub fn mean(&self) -> Option<Duration> {
        (self.count > 0)
            .then(|| Duration::from_nanos((self.sum.as_nanos() / self.count as u128) as u64))
    }

    /// Estimate the `q` quantile (`0.0..=1.0`), `None` when empty or `q` is not finite.
    ///
    /// Observations above the last bucket bound report that bound.
    pub fn quantile(&self, q: f64) -> Option<Duration> {
        if self.count == 0 || !q.is_finite() {
            return None;
        }

        let rank = q.clamp(0., 1.) * self.count as f64;
        let mut cumulative = 0u64;
        for (idx, bucket_count) in self.buckets.iter().copied().enumerate() {
            let before = cumulative;
            cumulative += bucket_count;
            if bucket_count == 0 || (cumulative as f64) < rank {
                continue;
            }

            let Some(upper) = LATENCY_BUCKETS_SECS.get(idx).copied() else {
                return Some(Duration::from_secs_f64(
                    LATENCY_BUCKETS_SECS[LATENCY_BUCKETS_SECS.len() - 1],
                ));
            };
            let lower = idx
                .checked_sub(1)
                .map(|prev| LATENCY_BUCKETS_SECS[prev])
                .unwrap_or(0.);
            let within = (rank - before as f64) / bucket_count as f64;
            return Some(Duration::from_secs_f64(lower + (upper - lower) * within));
        }

        None
    }
}

/// Aggregated view over all results of a run.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub counters: Counters,
    pub latency: LatencyHistogram,
}

impl Summary {
    pub fn record(&mut self, result: &IterationResult) {
        self.counters.record(result);
        self.latency.observe(result.latency);
    }

    pub fn p50(&self) -> Option<Duration> {
        self.latency.quantile(0.5)
    }

    pub fn p90(&self) -> Option<Duration> {
        self.latency.quantile(0.9)
    }

    pub fn p99(&self) -> Option<Duration> {
        self.latency.quantile(0.99)
    }
}
