use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::delay::{BackoffConfig, DelayStrategy};
use crate::error::PollError;
use crate::{DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS};

/// Per-attempt verdict from a rate-limit classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitDecision {
    /// The attempt must not count against the budget.
    pub is_rate_limited: bool,
    /// Wait this long instead of the configured delay.
    pub delay_override: Option<Duration>,
}

impl RateLimitDecision {
    pub fn limited(delay_override: Option<Duration>) -> Self {
        Self {
            is_rate_limited: true,
            delay_override,
        }
    }
}

type Predicate<V> = Box<dyn Fn(&V) -> bool + Send + Sync>;
type Classifier<V> = Box<dyn Fn(&V) -> Option<RateLimitDecision> + Send + Sync>;

/// Polls an async probe until a terminal result.
///
/// Built once per call site with the call site's own predicate and
/// classifiers, then reused for every poll.
pub struct ResilientPoller<T, E> {
    description: String,
    delay: DelayStrategy,
    max_attempts: u32,
    is_terminal: Predicate<T>,
    should_retry_on_error: Option<Predicate<E>>,
    rate_limit_on_error: Option<Classifier<E>>,
    rate_limit_on_result: Option<Classifier<T>>,
}

impl<T, E> ResilientPoller<T, E> {
    /// Creates a poller with a 1 s fixed delay and a 60 attempt budget.
    ///
    /// `description` names the operation in logs and errors.
    pub fn new(
        description: impl Into<String>,
        is_terminal: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            delay: DelayStrategy::Fixed(DEFAULT_DELAY),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            is_terminal: Box::new(is_terminal),
            should_retry_on_error: None,
            rate_limit_on_error: None,
            rate_limit_on_result: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = DelayStrategy::Fixed(delay);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.delay = DelayStrategy::Backoff(backoff);
        self
    }

    /// Sets the attempt budget. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Decides whether a probe error is retried. Without one, every error
    /// is retried until the budget runs out.
    pub fn retry_on_error(mut self, f: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.should_retry_on_error = Some(Box::new(f));
        self
    }

    pub fn rate_limit_on_error(
        mut self,
        f: impl Fn(&E) -> Option<RateLimitDecision> + Send + Sync + 'static,
    ) -> Self {
        self.rate_limit_on_error = Some(Box::new(f));
        self
    }

    pub fn rate_limit_on_result(
        mut self,
        f: impl Fn(&T) -> Option<RateLimitDecision> + Send + Sync + 'static,
    ) -> Self {
        self.rate_limit_on_result = Some(Box::new(f));
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs the poll loop.
    ///
    /// Cancellation is checked before every attempt and aborts both an
    /// in-flight probe and a pending wait. Rate-limited attempts are not
    /// counted and do not advance the backoff.
    pub async fn poll<F, Fut>(
        &self,
        mut probe: F,
        cancel: &CancellationToken,
    ) -> Result<T, PollError<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts: u32 = 0;
        let mut invocations: u32 = 0;
        let mut last_result: Option<T> = None;
        let mut last_error: Option<E> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempts));
            }

            attempts += 1;
            invocations += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempts)),
                outcome = probe() => outcome,
            };

            let decision = match outcome {
                Ok(value) => {
                    if (self.is_terminal)(&value) {
                        debug!(
                            operation = %self.description,
                            attempts,
                            invocations,
                            "poll reached terminal result"
                        );
                        return Ok(value);
                    }
                    let decision = self.rate_limit_on_result.as_ref().and_then(|f| f(&value));
                    last_result = Some(value);
                    decision
                }
                Err(err) => {
                    let retry = self.should_retry_on_error.as_ref().is_none_or(|f| f(&err));
                    if !retry {
                        return Err(PollError::Probe {
                            description: self.description.clone(),
                            attempts,
                            source: err,
                        });
                    }
                    let decision = self.rate_limit_on_error.as_ref().and_then(|f| f(&err));
                    last_error = Some(err);
                    decision
                }
            };

            let wait = match decision.filter(|d| d.is_rate_limited) {
                Some(d) => {
                    attempts -= 1;
                    let wait = d.delay_override.unwrap_or_else(|| self.delay.base_delay());
                    warn!(
                        operation = %self.description,
                        attempts,
                        delay_ms = wait.as_millis() as u64,
                        "rate limited, attempt not counted"
                    );
                    wait
                }
                None => {
                    if attempts >= self.max_attempts {
                        debug!(
                            operation = %self.description,
                            attempts,
                            invocations,
                            "poll attempts exhausted"
                        );
                        return Err(PollError::Timeout {
                            description: self.description.clone(),
                            attempts,
                            invocations,
                            last_result,
                            last_error,
                        });
                    }
                    self.delay.delay_for_attempt(attempts)
                }
            };

            trace!(
                operation = %self.description,
                attempts,
                delay_ms = wait.as_millis() as u64,
                "waiting before next attempt"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempts)),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    fn cancelled(&self, attempts: u32) -> PollError<T, E> {
        debug!(operation = %self.description, attempts, "poll cancelled");
        PollError::Cancelled {
            description: self.description.clone(),
            attempts,
        }
    }
}
