//! Wire types for the batch intake session protocol.
//!
//! Only the shapes the client needs are modelled: certificate listing,
//! batch session open/close, per-part upload targets and session status.
//! All JSON is camelCase.

pub mod constants;
pub mod messages;
pub mod types;

pub use messages::{
    BatchFileInfo, BatchFilePartInfo, EncryptionInfo, ExceptionDetail, ExceptionInfo,
    ExceptionResponse, OpenBatchSessionRequest, OpenBatchSessionResponse, SessionStatusResponse,
    StatusInfo,
};
pub use types::{
    CertificateUsage, FormCode, PemCertificateInfo, SessionFailure, SessionStatus, UploadTarget,
};
