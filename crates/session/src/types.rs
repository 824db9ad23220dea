//! Configuration, phases and events of a transfer.

use std::fmt;
use std::time::Duration;

use intake_protocol::FormCode;

/// Settings for [`SessionTransferOrchestrator`](crate::SessionTransferOrchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    /// Wait between session status checks.
    pub status_poll_delay: Duration,
    /// Status checks before giving up with a poll timeout.
    pub status_poll_attempts: u32,
    pub form_code: FormCode,
    /// Part file names are `{prefix}_{ordinal}.zip.aes`.
    pub part_file_name_prefix: String,
    /// Concurrent part uploads. 1 uploads in ordinal order.
    pub parallel_uploads: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            status_poll_delay: intake_poller::DEFAULT_DELAY,
            status_poll_attempts: intake_poller::DEFAULT_MAX_ATTEMPTS,
            form_code: FormCode::default(),
            part_file_name_prefix: "part".into(),
            parallel_uploads: 1,
        }
    }
}

impl TransferConfig {
    pub fn part_file_name(&self, ordinal: u32) -> String {
        format!("{}_{ordinal}.zip.aes", self.part_file_name_prefix)
    }
}

/// Stage of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Planning,
    Opening,
    Uploading,
    Closing,
    Polling,
    Succeeded,
    /// Processing finished with a domain failure code, or the transfer
    /// itself failed.
    Failed,
    TimedOut,
}

impl TransferPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planning => "planning",
            Self::Opening => "opening",
            Self::Uploading => "uploading",
            Self::Closing => "closing",
            Self::Polling => "polling",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Progress events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    PhaseChanged {
        phase: TransferPhase,
    },
    SessionOpened {
        reference_number: String,
        parts: usize,
    },
    PartUploaded {
        ordinal: u32,
        size_bytes: u64,
    },
    PartFailed {
        ordinal: u32,
        error: String,
    },
    StatusPolled {
        code: i32,
        description: String,
    },
}
