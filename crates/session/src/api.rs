//! Collaborator traits for the intake service.
//!
//! The HTTP client implements these; orchestrator tests use mocks.

use std::future::Future;
use std::pin::Pin;

use intake_protocol::{
    OpenBatchSessionRequest, OpenBatchSessionResponse, SessionStatus, UploadTarget,
};

use crate::error::ApiError;

/// Session endpoints of the intake service.
pub trait IntakeApi: Send + Sync {
    /// Opens a batch session and returns its reference number and one
    /// upload target per declared part.
    fn open_batch_session<'a>(
        &'a self,
        request: &'a OpenBatchSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OpenBatchSessionResponse, ApiError>> + Send + 'a>>;

    /// Closes a session once every part is uploaded.
    fn close_batch_session<'a>(
        &'a self,
        reference_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>>;

    fn session_status<'a>(
        &'a self,
        reference_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SessionStatus, ApiError>> + Send + 'a>>;
}

/// Sends one encrypted part as described by its upload target.
pub trait PartUploader: Send + Sync {
    fn upload_part<'a>(
        &'a self,
        target: &'a UploadTarget,
        body: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>>;
}
