use serde::{Deserialize, Serialize};

use crate::types::{FormCode, SessionStatus, UploadTarget};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Opens a batch session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBatchSessionRequest {
    pub form_code: FormCode,
    pub batch_file: BatchFileInfo,
    pub encryption: EncryptionInfo,
    #[serde(default, skip_serializing_if = "is_false")]
    pub offline_mode: bool,
}

/// Size and digest of the unencrypted package plus its declared parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFileInfo {
    pub file_size: i64,
    pub file_hash: String,
    pub file_parts: Vec<BatchFilePartInfo>,
}

/// Declaration of one encrypted part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFilePartInfo {
    pub ordinal_number: u32,
    pub file_name: String,
    pub file_size: i64,
    pub file_hash: String,
}

/// Wrapped key material for the session. Both fields are base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionInfo {
    pub encrypted_symmetric_key: String,
    pub initialization_vector: String,
}

fn is_false(v: &bool) -> bool {
    !*v
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Reply to [`OpenBatchSessionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBatchSessionResponse {
    pub reference_number: String,
    #[serde(default)]
    pub part_upload_requests: Vec<UploadTarget>,
}

/// Code and text of a session's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub code: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Reply of the session status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub status: StatusInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful_invoice_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_invoice_count: Option<u32>,
}

impl From<SessionStatusResponse> for SessionStatus {
    fn from(resp: SessionStatusResponse) -> Self {
        Self {
            code: resp.status.code,
            description: resp.status.description,
            details: resp.status.details,
            successful_count: resp.successful_invoice_count.unwrap_or(0),
            failed_count: resp.failed_invoice_count.unwrap_or(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionResponse {
    pub exception: ExceptionInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    #[serde(default)]
    pub exception_detail_list: Vec<ExceptionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetail {
    pub exception_code: i32,
    #[serde(default)]
    pub exception_description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ExceptionResponse {
    /// Joins every detail into one line, e.g. `21405: too many parts`.
    pub fn summary(&self) -> String {
        self.exception
            .exception_detail_list
            .iter()
            .map(|d| {
                if d.details.is_empty() {
                    format!("{}: {}", d.exception_code, d.exception_description)
                } else {
                    format!(
                        "{}: {} ({})",
                        d.exception_code,
                        d.exception_description,
                        d.details.join("; ")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
