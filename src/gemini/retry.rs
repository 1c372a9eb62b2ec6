use std::time::Duration;

/// Capped exponential backoff bounded by an overall deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub maximum: Duration,
    /// Total time budget for one call, retries included.
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(10),
            multiplier: 2.0,
            maximum: Duration::from_secs(60),
            deadline: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub const fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            multiplier: 1.0,
            maximum: Duration::ZERO,
            deadline: Duration::ZERO,
        }
    }

    /// Equal jitter backoff: cap/2 + rand(0, cap/2), where
    /// cap = min(initial * multiplier^attempt, maximum).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.maximum.as_secs_f64());
        let half = capped / 2.0;
        Duration::from_secs_f64(half + fastrand::f64() * half)
    }

    /// Whether sleeping for `delay` keeps the call inside its deadline.
    pub fn allows(&self, elapsed: Duration, delay: Duration) -> bool {
        elapsed.saturating_add(delay) <= self.deadline && !self.deadline.is_zero()
    }
}
