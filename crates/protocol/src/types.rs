use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    STATUS_DECRYPTION_ERROR, STATUS_INVALID_DOCUMENTS, STATUS_INVALID_IV,
    STATUS_INVALID_WRAPPED_KEY, STATUS_INVOICE_LIMIT_EXCEEDED, STATUS_PROCESSING, STATUS_SUCCESS,
};

/// Document schema the session is opened for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormCode {
    pub system_code: String,
    pub schema_version: String,
    pub value: String,
}

impl Default for FormCode {
    fn default() -> Self {
        Self {
            system_code: "FA (3)".into(),
            schema_version: "1-0E".into(),
            value: "FA".into(),
        }
    }
}

/// What a server certificate may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificateUsage {
    /// Wrapping the per-session symmetric key.
    SymmetricKeyEncryption,
    /// Encrypting authentication tokens.
    #[serde(rename = "KsefTokenEncryption")]
    TokenEncryption,
    #[serde(other)]
    Unknown,
}

/// One entry of the public certificate listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PemCertificateInfo {
    /// Base64 of the DER-encoded certificate.
    pub certificate: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub usage: Vec<CertificateUsage>,
}

impl PemCertificateInfo {
    /// Returns `true` if the certificate is tagged for `usage`.
    pub fn has_usage(&self, usage: CertificateUsage) -> bool {
        self.usage.contains(&usage)
    }
}

/// Server-issued descriptor telling the client where to send one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub ordinal_number: u32,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Snapshot of a session's processing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub code: i32,
    pub description: String,
    pub details: Vec<String>,
    pub successful_count: u32,
    pub failed_count: u32,
}

/// Domain failure reported as a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFailure {
    InvalidDocumentContent,
    DecryptionError,
    InvoiceLimitExceeded,
    InvalidWrappedKey,
    InvalidInitializationVector,
    /// Any other terminal code that is not success.
    Other(i32),
}

impl SessionStatus {
    /// Returns `true` while the service is still working on the session.
    pub fn is_processing(&self) -> bool {
        self.code == STATUS_PROCESSING
    }

    pub fn is_success(&self) -> bool {
        self.code == STATUS_SUCCESS
    }

    /// Classifies a terminal, non-success code. `None` for success and
    /// for the processing code.
    pub fn failure_kind(&self) -> Option<SessionFailure> {
        match self.code {
            STATUS_PROCESSING | STATUS_SUCCESS => None,
            STATUS_INVALID_DOCUMENTS => Some(SessionFailure::InvalidDocumentContent),
            STATUS_DECRYPTION_ERROR => Some(SessionFailure::DecryptionError),
            STATUS_INVOICE_LIMIT_EXCEEDED => Some(SessionFailure::InvoiceLimitExceeded),
            STATUS_INVALID_WRAPPED_KEY => Some(SessionFailure::InvalidWrappedKey),
            STATUS_INVALID_IV => Some(SessionFailure::InvalidInitializationVector),
            other => Some(SessionFailure::Other(other)),
        }
    }
}
