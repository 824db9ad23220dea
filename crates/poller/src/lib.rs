//! Resilient polling engine.
//!
//! [`ResilientPoller`] repeatedly invokes an async probe until a terminal
//! result arrives, an error classifier gives up, the attempt budget runs out,
//! or the caller cancels. It knows nothing about what it polls: each call site
//! supplies its own terminal predicate and classifiers.

mod delay;
mod error;
mod poller;

pub use delay::{BackoffConfig, DelayStrategy};
pub use error::PollError;
pub use poller::{RateLimitDecision, ResilientPoller};

use std::time::Duration;

/// Default wait between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
