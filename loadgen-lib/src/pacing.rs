use std::time::Duration;

/// Delay inserted between iterations when none is configured.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(100);

/// Pacing of a single runner.
///
/// The delay is applied after an iteration completed (or failed),
/// so it comes on top of the request latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub delay: Duration,
}

impl PacingConfig {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PACING_DELAY)
    }
}
