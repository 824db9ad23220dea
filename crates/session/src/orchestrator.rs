//! Drives one batch transfer from key generation to final status.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use intake_crypto::EncryptionSession;
use intake_poller::{PollError, ResilientPoller};
use intake_protocol::{
    BatchFileInfo, BatchFilePartInfo, EncryptionInfo, OpenBatchSessionRequest, SessionStatus,
    UploadTarget,
};
use intake_transfer::{
    BatchPart, ChunkedPackage, MAX_PACKAGE_SIZE, MAX_PART_SIZE, MAX_PARTS, PackageError,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{IntakeApi, PartUploader};
use crate::error::{ApiError, PartUploadFailure, TransferError};
use crate::planner::SessionEncryptionPlanner;
use crate::types::{TransferConfig, TransferEvent, TransferPhase};

enum PartOutcome {
    Uploaded,
    Failed(String),
    Skipped,
}

/// Runs batch transfers: plan, open, upload, close, poll.
pub struct SessionTransferOrchestrator {
    planner: SessionEncryptionPlanner,
    api: Arc<dyn IntakeApi>,
    uploader: Arc<dyn PartUploader>,
    config: TransferConfig,
    events_tx: mpsc::Sender<TransferEvent>,
    events_rx: Option<mpsc::Receiver<TransferEvent>>,
    cancel: CancellationToken,
}

impl SessionTransferOrchestrator {
    pub fn new(
        planner: SessionEncryptionPlanner,
        api: Arc<dyn IntakeApi>,
        uploader: Arc<dyn PartUploader>,
        config: TransferConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            planner,
            api,
            uploader,
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransferEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token shared by every phase.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Transfers `payload` split into at most `part_count` parts and waits
    /// for the service to finish processing it.
    ///
    /// A domain failure status (decryption error, limit exceeded, ...) is
    /// returned as `Ok`; inspect [`SessionStatus::failure_kind`].
    pub async fn transfer(
        &self,
        payload: &[u8],
        part_count: usize,
    ) -> Result<SessionStatus, TransferError> {
        match self.run(payload, part_count).await {
            Ok(status) => {
                let phase = if status.is_success() {
                    TransferPhase::Succeeded
                } else {
                    TransferPhase::Failed
                };
                self.set_phase(phase);
                info!(
                    code = status.code,
                    successful = status.successful_count,
                    failed = status.failed_count,
                    "session processing finished"
                );
                Ok(status)
            }
            Err(e) => {
                let phase = match e {
                    TransferError::PollTimeout { .. } => TransferPhase::TimedOut,
                    _ => TransferPhase::Failed,
                };
                self.set_phase(phase);
                error!(error = %e, category = ?e.category(), "transfer failed");
                Err(e)
            }
        }
    }

    async fn run(&self, payload: &[u8], part_count: usize) -> Result<SessionStatus, TransferError> {
        // 1. Planning
        self.set_phase(TransferPhase::Planning);
        self.check_cancelled(TransferPhase::Planning)?;
        precheck(payload.len() as u64, part_count)?;
        let session = self.planner.create_session()?;
        let package = intake_transfer::split(payload, &session, part_count)?;
        intake_transfer::validate_limits(&package)?;
        debug!(
            size = package.plain_size(),
            parts = package.parts.len(),
            "package prepared"
        );

        // 2. Opening
        self.set_phase(TransferPhase::Opening);
        self.check_cancelled(TransferPhase::Opening)?;
        let request = self.open_request(&package, &session);
        let opened = self
            .api
            .open_batch_session(&request)
            .await
            .map_err(|e| TransferError::from_api(TransferPhase::Opening, e))?;
        let reference_number = opened.reference_number;
        info!(
            reference_number = %reference_number,
            parts = package.parts.len(),
            "batch session opened"
        );
        self.emit(TransferEvent::SessionOpened {
            reference_number: reference_number.clone(),
            parts: package.parts.len(),
        });

        // 3. Uploading
        self.upload_parts(&reference_number, &opened.part_upload_requests, &package.parts)
            .await?;

        // 4. Closing
        self.set_phase(TransferPhase::Closing);
        self.check_cancelled(TransferPhase::Closing)?;
        self.api
            .close_batch_session(&reference_number)
            .await
            .map_err(|e| TransferError::from_api(TransferPhase::Closing, e))?;
        info!(reference_number = %reference_number, "batch session closed");

        // 5. Polling
        self.await_status(&reference_number).await
    }

    /// Uploads every part to its matching target.
    ///
    /// Targets and parts must match one to one by ordinal; otherwise nothing
    /// is sent. All uploads are attempted even if some fail, and failures
    /// are reported together. May be called again after an
    /// [`TransferError::AggregateTransfer`] to repeat the whole phase.
    pub async fn upload_parts(
        &self,
        reference_number: &str,
        targets: &[UploadTarget],
        parts: &[BatchPart],
    ) -> Result<(), TransferError> {
        self.set_phase(TransferPhase::Uploading);
        self.check_cancelled(TransferPhase::Uploading)?;
        let pairs = match_targets(targets, parts)?;
        let concurrency = self.config.parallel_uploads.max(1);
        debug!(
            reference_number = %reference_number,
            parts = pairs.len(),
            concurrency,
            "uploading parts"
        );

        let outcomes: Vec<(u32, PartOutcome)> = stream::iter(pairs)
            .map(|(target, part)| self.upload_one(target, part))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut failures = Vec::new();
        let mut skipped = 0usize;
        for (ordinal, outcome) in outcomes {
            match outcome {
                PartOutcome::Uploaded => {}
                PartOutcome::Failed(message) => failures.push(PartUploadFailure { ordinal, message }),
                PartOutcome::Skipped => skipped += 1,
            }
        }

        failures.sort_by_key(|f| f.ordinal);
        if skipped > 0 {
            if !failures.is_empty() {
                let failed: Vec<u32> = failures.iter().map(|f| f.ordinal).collect();
                warn!(
                    reference_number = %reference_number,
                    failed = ?failed,
                    "parts failed before the upload was cancelled"
                );
            }
            info!(
                reference_number = %reference_number,
                skipped,
                "upload cancelled before all parts were sent"
            );
            return Err(TransferError::Cancelled {
                phase: TransferPhase::Uploading,
            });
        }

        if !failures.is_empty() {
            return Err(TransferError::AggregateTransfer {
                reference_number: reference_number.to_string(),
                failures,
            });
        }

        info!(reference_number = %reference_number, "all parts uploaded");
        Ok(())
    }

    async fn upload_one(&self, target: &UploadTarget, part: &BatchPart) -> (u32, PartOutcome) {
        let ordinal = part.ordinal_number;
        // In-flight uploads finish; cancellation only stops new ones.
        if self.cancel.is_cancelled() {
            return (ordinal, PartOutcome::Skipped);
        }

        match self.uploader.upload_part(target, &part.payload).await {
            Ok(()) => {
                debug!(ordinal, size = part.payload.len(), "part uploaded");
                self.emit(TransferEvent::PartUploaded {
                    ordinal,
                    size_bytes: part.payload.len() as u64,
                });
                (ordinal, PartOutcome::Uploaded)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(ordinal, error = %message, "part upload failed");
                self.emit(TransferEvent::PartFailed {
                    ordinal,
                    error: message.clone(),
                });
                (ordinal, PartOutcome::Failed(message))
            }
        }
    }

    async fn await_status(&self, reference_number: &str) -> Result<SessionStatus, TransferError> {
        self.set_phase(TransferPhase::Polling);
        let poller = ResilientPoller::new(
            format!("session {reference_number} status"),
            |s: &SessionStatus| !s.is_processing(),
        )
        .with_delay(self.config.status_poll_delay)
        .with_max_attempts(self.config.status_poll_attempts)
        .retry_on_error(ApiError::is_transient)
        .rate_limit_on_error(ApiError::rate_limit);

        poller
            .poll(|| self.probe_status(reference_number), &self.cancel)
            .await
            .map_err(|e| match e {
                PollError::Timeout {
                    attempts,
                    last_result,
                    last_error,
                    ..
                } => TransferError::PollTimeout {
                    reference_number: reference_number.to_string(),
                    attempts,
                    last_status: last_result,
                    last_error,
                },
                PollError::Cancelled { .. } => TransferError::Cancelled {
                    phase: TransferPhase::Polling,
                },
                PollError::Probe { source, .. } => {
                    TransferError::from_api(TransferPhase::Polling, source)
                }
            })
    }

    async fn probe_status(&self, reference_number: &str) -> Result<SessionStatus, ApiError> {
        let status = self.api.session_status(reference_number).await?;
        debug!(
            reference_number = %reference_number,
            code = status.code,
            "session status"
        );
        self.emit(TransferEvent::StatusPolled {
            code: status.code,
            description: status.description.clone(),
        });
        Ok(status)
    }

    fn open_request(
        &self,
        package: &ChunkedPackage,
        session: &EncryptionSession,
    ) -> OpenBatchSessionRequest {
        OpenBatchSessionRequest {
            form_code: self.config.form_code.clone(),
            batch_file: BatchFileInfo {
                file_size: package.metadata.size_bytes,
                file_hash: package.metadata.sha256_hash.clone(),
                file_parts: package
                    .parts
                    .iter()
                    .map(|p| BatchFilePartInfo {
                        ordinal_number: p.ordinal_number,
                        file_name: self.config.part_file_name(p.ordinal_number),
                        file_size: p.metadata.size_bytes,
                        file_hash: p.metadata.sha256_hash.clone(),
                    })
                    .collect(),
            },
            encryption: EncryptionInfo {
                encrypted_symmetric_key: session.wrapped_key().to_string(),
                initialization_vector: session.wrapped_iv().to_string(),
            },
            offline_mode: false,
        }
    }

    fn set_phase(&self, phase: TransferPhase) {
        debug!(%phase, "transfer phase");
        self.emit(TransferEvent::PhaseChanged { phase });
    }

    /// Events are best-effort: a full or closed channel drops them.
    fn emit(&self, event: TransferEvent) {
        let _ = self.events_tx.try_send(event);
    }

    fn check_cancelled(&self, phase: TransferPhase) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            Err(TransferError::Cancelled { phase })
        } else {
            Ok(())
        }
    }
}

/// Rejects inputs that cannot fit the protocol limits before any
/// encryption work.
fn precheck(len: u64, part_count: usize) -> Result<(), PackageError> {
    if len > MAX_PACKAGE_SIZE {
        return Err(PackageError::PackageTooLarge {
            size: len,
            max: MAX_PACKAGE_SIZE,
        });
    }
    if part_count > MAX_PARTS {
        return Err(PackageError::TooManyParts {
            count: part_count,
            max: MAX_PARTS,
        });
    }
    if part_count == 0 {
        return Err(PackageError::InvalidPartCount(part_count));
    }
    // The first part is always the largest.
    let largest = len.div_ceil(part_count as u64);
    if largest > MAX_PART_SIZE {
        return Err(PackageError::PartTooLarge {
            ordinal: 1,
            size: largest,
            max: MAX_PART_SIZE,
        });
    }
    Ok(())
}

/// Pairs each target with the part of the same ordinal, in ordinal order.
fn match_targets<'a>(
    targets: &'a [UploadTarget],
    parts: &'a [BatchPart],
) -> Result<Vec<(&'a UploadTarget, &'a BatchPart)>, TransferError> {
    let by_ordinal: BTreeMap<u32, &BatchPart> =
        parts.iter().map(|p| (p.ordinal_number, p)).collect();

    let mut seen = BTreeSet::new();
    let mut duplicate_targets = Vec::new();
    let mut targets_without_part = Vec::new();
    let mut pairs = Vec::with_capacity(targets.len());

    for target in targets {
        let ordinal = target.ordinal_number;
        if !seen.insert(ordinal) {
            duplicate_targets.push(ordinal);
            continue;
        }
        match by_ordinal.get(&ordinal) {
            Some(part) => pairs.push((target, *part)),
            None => targets_without_part.push(ordinal),
        }
    }

    let parts_without_target: Vec<u32> = by_ordinal
        .keys()
        .filter(|o| !seen.contains(*o))
        .copied()
        .collect();

    if !targets_without_part.is_empty()
        || !parts_without_target.is_empty()
        || !duplicate_targets.is_empty()
    {
        return Err(TransferError::PartMapping {
            targets_without_part,
            parts_without_target,
            duplicate_targets,
        });
    }

    pairs.sort_by_key(|(t, _)| t.ordinal_number);
    Ok(pairs)
}
