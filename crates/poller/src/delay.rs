use std::time::Duration;

use rand::Rng;

use crate::DEFAULT_DELAY;

/// Configuration for exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first counted attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier applied after each counted attempt.
    pub factor: f64,
    /// Apply ±50% random jitter to every computed delay.
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Calculates the delay after a given counted attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if !self.jitter {
            return Duration::from_secs_f64(capped);
        }
        let scale = rand::thread_rng().gen_range(0.5..=1.5);
        Duration::from_secs_f64(capped * scale)
    }
}

/// How long to wait between attempts that count against the budget.
#[derive(Debug, Clone, PartialEq)]
pub enum DelayStrategy {
    Fixed(Duration),
    Backoff(BackoffConfig),
}

impl Default for DelayStrategy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_DELAY)
    }
}

impl DelayStrategy {
    /// Wait after counted attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Backoff(cfg) => cfg.delay_for_attempt(attempt),
        }
    }

    /// Wait used for a rate-limited attempt that carries no override.
    pub fn base_delay(&self) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Backoff(cfg) => cfg.initial_delay,
        }
    }
}
