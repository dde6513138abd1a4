//! Bounded retries

use rand::Rng;
use std::time::Duration;

/// How many times an operation is tried and how long to pause in between.
///
/// Pauses double from `initial_delay` up to `max_delay`, plus up to a
/// quarter of random jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// `attempts` counts the first try; it is raised to 1 when 0.
    pub fn new(attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            initial_delay,
            max_delay,
        }
    }

    pub fn with_attempts(self, attempts: u32) -> Self {
        Self::new(attempts, self.initial_delay, self.max_delay)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pause after try number `attempt` (1-based) failed, or `None` when it
    /// was the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let capped = self.initial_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis() as u64 / 4);
        Some(capped + Duration::from_millis(jitter_ms))
    }
}

impl Default for RetryPolicy {
    /// Three tries, pausing 1 s then 2 s (capped at 30 s).
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(30))
    }
}
