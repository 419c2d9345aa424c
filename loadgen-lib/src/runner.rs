use std::{num::NonZeroU64, time::Duration};

use rama::{
    Service,
    error::BoxError,
    graceful::ShutdownGuard,
    http::{Request, Response},
    telemetry::tracing,
};
use tokio::time::Instant;

use crate::{
    iteration::{self, IterationResult},
    pacing::PacingConfig,
    request::RequestSpec,
};

/// Per-request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Limits and pacing of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub pacing: PacingConfig,
    /// Stop after this many iterations; unbounded when absent.
    pub iterations: Option<NonZeroU64>,
    /// Stop once this much time passed since the first iteration started.
    pub duration: Option<Duration>,
    /// `None` waits for as long as the request takes.
    pub request_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            iterations: None,
            duration: None,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// Lifecycle of a [`RunSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No iteration was requested yet.
    Idle,
    Running,
    /// Cancelled, or the run duration elapsed.
    Stopped,
    /// The configured iteration count was exhausted.
    Completed,
}

/// A single virtual user: one request in flight at a time, paced by a fixed delay.
///
/// Runners share nothing but the (cloned) client,
/// so many of them can be driven concurrently on the same runtime.
#[derive(Debug, Clone)]
pub struct Runner<S> {
    client: S,
    spec: RequestSpec,
    cfg: RunConfig,
}

impl<S> Runner<S>
where
    S: Service<Request, Output = Response, Error: Into<BoxError>>,
{
    pub fn new(client: S, spec: RequestSpec, cfg: RunConfig) -> Self {
        Self { client, spec, cfg }
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    /// Run one iteration, outside of any sequence or pacing.
    pub async fn run_iteration(&self) -> IterationResult {
        iteration::run_iteration(&self.client, &self.spec, self.cfg.request_timeout).await
    }

    /// Start a new run from iteration zero.
    ///
    /// Nothing happens until [`RunSequence::next_result`] is awaited.
    /// The run stops early once `guard` is cancelled.
    pub fn run(&self, guard: ShutdownGuard) -> RunSequence<'_, S> {
        RunSequence {
            runner: self,
            guard,
            state: RunState::Idle,
            completed: 0,
            last_end: None,
            deadline: None,
        }
    }
}

/// Lazy sequence of iteration results produced by [`Runner::run`].
///
/// Cancellation is checked before every iteration and while pacing.
/// A cancellation observed while a request is in flight abandons that request:
/// its future is dropped and no result is produced for it.
pub struct RunSequence<'a, S> {
    runner: &'a Runner<S>,
    guard: ShutdownGuard,
    state: RunState,
    completed: u64,
    last_end: Option<Instant>,
    deadline: Option<Instant>,
}

impl<S> std::fmt::Debug for RunSequence<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSequence")
            .field("state", &self.state)
            .field("completed", &self.completed)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl<S> RunSequence<'_, S>
where
    S: Service<Request, Output = Response, Error: Into<BoxError>>,
{
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of iterations that produced a result so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Pace, run the next iteration and return its result.
    ///
    /// Returns `None` once the run is stopped or completed, and keeps doing so.
    pub async fn next_result(&mut self) -> Option<IterationResult> {
        let cfg = *self.runner.config();

        match self.state {
            RunState::Stopped | RunState::Completed => return None,
            RunState::Idle => {
                self.state = RunState::Running;
                self.deadline = cfg.duration.map(|duration| Instant::now() + duration);
                tracing::info!(
                    target_uri = %self.runner.spec().target_uri(),
                    pacing = ?cfg.pacing.delay,
                    iterations = ?cfg.iterations,
                    duration = ?cfg.duration,
                    timeout = ?cfg.request_timeout,
                    "run started",
                );
            }
            RunState::Running => (),
        }

        if cfg
            .iterations
            .is_some_and(|iterations| self.completed >= iterations.get())
        {
            self.state = RunState::Completed;
            tracing::info!(completed = self.completed, "run completed");
            return None;
        }

        // the first iteration starts right away
        let wake = match (self.last_end, self.deadline) {
            (Some(last_end), Some(deadline)) => (last_end + cfg.pacing.delay).min(deadline),
            (Some(last_end), None) => last_end + cfg.pacing.delay,
            (None, _) => Instant::now(),
        };
        let cancelled = tokio::select! {
            biased;
            _ = self.guard.cancelled() => true,
            _ = tokio::time::sleep_until(wake) => false,
        };
        if cancelled {
            return self.stop("cancelled while pacing");
        }

        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return self.stop("run duration elapsed");
        }

        let maybe_result = tokio::select! {
            biased;
            _ = self.guard.cancelled() => None,
            result = self.runner.run_iteration() => Some(result),
        };
        let Some(result) = maybe_result else {
            return self.stop("cancelled during request: in-flight request abandoned");
        };

        self.completed += 1;
        self.last_end = Some(Instant::now());

        tracing::debug!(
            iteration = self.completed,
            latency = ?result.latency,
            status = ?result.status,
            failure = ?result.failure,
            "iteration done",
        );

        Some(result)
    }

    /// Drain the sequence into a vector.
    ///
    /// Only returns for runs bounded by an iteration count, a duration or cancellation.
    pub async fn collect_results(mut self) -> Vec<IterationResult> {
        let mut results = Vec::new();
        while let Some(result) = self.next_result().await {
            results.push(result);
        }
        results
    }

    fn stop(&mut self, reason: &str) -> Option<IterationResult> {
        self.state = RunState::Stopped;
        tracing::info!(completed = self.completed, "run stopped: {reason}");
        None
    }
}
