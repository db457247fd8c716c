//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay schedule for a run of consecutive failures.
///
/// Each [`next_delay`](Backoff::next_delay) doubles the previous delay up to
/// `max`, plus up to 10% jitter. [`reset`](Backoff::reset) starts over.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max, attempt: 0 }
    }

    /// Failures seen since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.base, self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u32.saturating_pow(attempt - 1);
    let capped_delay = base.saturating_mul(exponential_base).min(max);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > Duration::ZERO {
        rand::thread_rng().gen_range(Duration::ZERO..jitter_range)
    } else {
        Duration::ZERO
    };

    capped_delay + jitter
}
