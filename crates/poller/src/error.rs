/// Errors returned by [`ResilientPoller::poll`](crate::ResilientPoller::poll).
#[derive(Debug, thiserror::Error)]
pub enum PollError<T, E> {
    /// The attempt budget ran out without a terminal result.
    #[error("{description}: no terminal result after {attempts} attempts")]
    Timeout {
        description: String,
        /// Attempts counted against the budget.
        attempts: u32,
        /// Probe invocations, including rate-limited ones.
        invocations: u32,
        /// Last non-terminal result, if any attempt succeeded.
        last_result: Option<T>,
        /// Last probe error, if any attempt failed.
        last_error: Option<E>,
    },

    #[error("{description}: cancelled")]
    Cancelled { description: String, attempts: u32 },

    /// The probe failed and the error classifier chose not to retry.
    #[error("{description}: {source}")]
    Probe {
        description: String,
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<T, E> PollError<T, E> {
    /// Counted attempts at the time the poll stopped.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Timeout { attempts, .. }
            | Self::Cancelled { attempts, .. }
            | Self::Probe { attempts, .. } => *attempts,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
