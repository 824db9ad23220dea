//! HTTP client for the batch intake service.
//!
//! [`IntakeClient`] implements the collaborator traits consumed by the
//! certificate cache and the transfer orchestrator on top of `reqwest`
//! with Bearer token authentication.

mod client;
mod response;

use std::time::Duration;

pub use client::IntakeClient;
pub use response::parse_retry_after;

pub const DEFAULT_BASE_URL: &str = "https://ksef-test.mf.gov.pl/api/v2";

/// Connection settings for [`IntakeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Bearer token sent to the service endpoints. Never sent to upload
    /// targets.
    pub access_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Slowest uplink a part upload must tolerate, in bytes per second.
    /// Upload timeouts grow by the time a part takes at this rate.
    pub min_upload_rate: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: String::new(),
            timeout: Duration::from_secs(120),
            min_upload_rate: 128 * 1024,
        }
    }
}

/// Errors building an [`IntakeClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("access token is empty")]
    MissingToken,
}
