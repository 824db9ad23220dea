//! Batch transfer flow: key planning, part upload and status polling.
//!
//! This crate holds the transfer **business logic** only. The intake
//! service is reached through the [`IntakeApi`] and [`PartUploader`]
//! traits, implemented over HTTP by `intake-client`.
//!
//! # Pipeline
//!
//! 1. **Planning**: fresh key material, split and encrypt the package
//! 2. **Opening**: declare the parts, receive one upload target per part
//! 3. **Uploading**: send every part, collecting failures
//! 4. **Closing**: tell the service all parts are in
//! 5. **Polling**: wait for a terminal processing status

pub mod api;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod types;

#[cfg(test)]
mod test_util;

pub use api::{IntakeApi, PartUploader};
pub use error::{ApiError, FailureCategory, PartUploadFailure, TransferError};
pub use orchestrator::SessionTransferOrchestrator;
pub use planner::SessionEncryptionPlanner;
pub use types::{TransferConfig, TransferEvent, TransferPhase};
