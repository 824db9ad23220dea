//! Transfer error types.

use std::time::Duration;

use intake_poller::RateLimitDecision;
use intake_protocol::SessionStatus;

use crate::types::TransferPhase;

/// Failure of a single intake API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Parsed `Retry-After` header.
        retry_after: Option<Duration>,
    },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Errors worth retrying: 5xx, 408, 429, timeouts and connection failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Timeout(_) | Self::Connect(_) => true,
            Self::Decode(_) | Self::Cancelled => false,
        }
    }

    /// The service refused the request as malformed (400, 413, 422).
    pub fn is_validation(&self) -> bool {
        matches!(self.status(), Some(400 | 413 | 422))
    }

    /// HTTP 429 becomes a rate-limit decision honouring `Retry-After`.
    pub fn rate_limit(&self) -> Option<RateLimitDecision> {
        match self {
            Self::Status {
                status: 429,
                retry_after,
                ..
            } => Some(RateLimitDecision::limited(*retry_after)),
            _ => None,
        }
    }
}

/// One failed part upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartUploadFailure {
    pub ordinal: u32,
    pub message: String,
}

/// Coarse classification every [`TransferError`] maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    CredentialUnavailable,
    ProtocolValidation,
    PartUpload,
    PollTimeout,
    Cancelled,
}

/// Errors produced by a transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("no usable certificate: {0}")]
    CredentialUnavailable(#[from] intake_certs::CertError),

    #[error("key material error: {0}")]
    Crypto(#[from] intake_crypto::CryptoError),

    #[error("package rejected: {0}")]
    Chunking(#[from] intake_transfer::PackageError),

    /// The service refused an open or close request.
    #[error("{phase} rejected by service: {message}")]
    ProtocolValidation { phase: TransferPhase, message: String },

    /// Upload targets and parts do not correspond one to one.
    #[error(
        "upload targets do not match parts (targets without part: {targets_without_part:?}, \
         parts without target: {parts_without_target:?}, duplicate targets: {duplicate_targets:?})"
    )]
    PartMapping {
        targets_without_part: Vec<u32>,
        parts_without_target: Vec<u32>,
        duplicate_targets: Vec<u32>,
    },

    #[error(
        "{} part upload(s) failed in session {reference_number}: {}",
        .failures.len(),
        summarize(.failures)
    )]
    AggregateTransfer {
        reference_number: String,
        failures: Vec<PartUploadFailure>,
    },

    #[error("session {reference_number} still processing after {attempts} status checks")]
    PollTimeout {
        reference_number: String,
        attempts: u32,
        last_status: Option<SessionStatus>,
        last_error: Option<ApiError>,
    },

    #[error("transfer cancelled during {phase}")]
    Cancelled { phase: TransferPhase },

    #[error("{phase} failed: {source}")]
    Api {
        phase: TransferPhase,
        #[source]
        source: ApiError,
    },
}

impl TransferError {
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::CredentialUnavailable(_) | Self::Crypto(_) => FailureCategory::CredentialUnavailable,
            Self::Chunking(_) | Self::ProtocolValidation { .. } | Self::PartMapping { .. } => {
                FailureCategory::ProtocolValidation
            }
            Self::AggregateTransfer { .. } => FailureCategory::PartUpload,
            Self::PollTimeout { .. } => FailureCategory::PollTimeout,
            Self::Cancelled { .. } => FailureCategory::Cancelled,
            // A status probe that failed for good leaves the outcome unknown.
            Self::Api {
                phase: TransferPhase::Polling,
                ..
            } => FailureCategory::PollTimeout,
            Self::Api { .. } => FailureCategory::ProtocolValidation,
        }
    }

    /// Wraps an API error from `phase`, promoting validation rejections.
    pub(crate) fn from_api(phase: TransferPhase, source: ApiError) -> Self {
        match source {
            ApiError::Cancelled => Self::Cancelled { phase },
            e if e.is_validation() => Self::ProtocolValidation {
                phase,
                message: e.to_string(),
            },
            source => Self::Api { phase, source },
        }
    }
}

fn summarize(failures: &[PartUploadFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("part {}: {}", f.ordinal, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}
