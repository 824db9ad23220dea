//! Mocks shared by the planner and orchestrator tests.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{TimeDelta, Utc};
use intake_certs::{CacheConfig, CertError, CertificateMaterialCache, CertificateSource};
use intake_crypto::test_support;
use intake_protocol::{
    CertificateUsage, OpenBatchSessionRequest, OpenBatchSessionResponse, PemCertificateInfo,
    SessionStatus, UploadTarget,
};
use rsa::Oaep;
use sha2::Sha256;
use tokio_util::sync::CancellationToken;

use crate::api::{IntakeApi, PartUploader};
use crate::error::ApiError;

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

struct FixtureSource {
    available: bool,
}

impl CertificateSource for FixtureSource {
    fn fetch_public_certificates<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
    ) -> BoxFut<'a, Result<Vec<PemCertificateInfo>, CertError>> {
        Box::pin(async move {
            if !self.available {
                return Err(CertError::Fetch("service unavailable".into()));
            }
            Ok(vec![PemCertificateInfo {
                certificate: test_support::certificate_base64(),
                valid_from: Utc::now() - TimeDelta::days(1),
                valid_to: Utc::now() + TimeDelta::days(365),
                usage: vec![
                    CertificateUsage::SymmetricKeyEncryption,
                    CertificateUsage::TokenEncryption,
                ],
            }])
        })
    }
}

pub(crate) async fn warmed_cache() -> Arc<CertificateMaterialCache> {
    let cache = CertificateMaterialCache::new(
        Arc::new(FixtureSource { available: true }),
        CacheConfig::default(),
    );
    cache.warmup().await.unwrap();
    Arc::new(cache)
}

pub(crate) fn cold_cache() -> Arc<CertificateMaterialCache> {
    Arc::new(CertificateMaterialCache::new(
        Arc::new(FixtureSource { available: false }),
        CacheConfig::default(),
    ))
}

// ---------------------------------------------------------------------------
// Intake API
// ---------------------------------------------------------------------------

pub(crate) fn status(code: i32) -> SessionStatus {
    SessionStatus {
        code,
        description: format!("status {code}"),
        details: Vec::new(),
        successful_count: 0,
        failed_count: 0,
    }
}

pub(crate) fn target(ordinal: u32) -> UploadTarget {
    UploadTarget {
        ordinal_number: ordinal,
        method: "PUT".into(),
        url: format!("https://upload.test/parts/{ordinal}"),
        headers: BTreeMap::from([("x-ms-blob-type".to_string(), "BlockBlob".to_string())]),
    }
}

pub(crate) fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

#[derive(Default)]
pub(crate) struct MockApi {
    calls: Mutex<Vec<&'static str>>,
    open_request: Mutex<Option<OpenBatchSessionRequest>>,
    targets: Mutex<Option<Vec<UploadTarget>>>,
    open_error: Mutex<Option<ApiError>>,
    close_error: Mutex<Option<ApiError>>,
    statuses: Mutex<VecDeque<Result<SessionStatus, ApiError>>>,
}

impl MockApi {
    pub(crate) fn with_statuses(statuses: Vec<Result<SessionStatus, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.into()),
            ..Self::default()
        })
    }

    /// Overrides the targets returned on open; by default one per declared part.
    pub(crate) fn set_targets(&self, targets: Vec<UploadTarget>) {
        *self.targets.lock().unwrap() = Some(targets);
    }

    pub(crate) fn fail_open(&self, err: ApiError) {
        *self.open_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_close(&self, err: ApiError) {
        *self.close_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn open_request(&self) -> Option<OpenBatchSessionRequest> {
        self.open_request.lock().unwrap().clone()
    }
}

impl IntakeApi for MockApi {
    fn open_batch_session<'a>(
        &'a self,
        request: &'a OpenBatchSessionRequest,
    ) -> BoxFut<'a, Result<OpenBatchSessionResponse, ApiError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("open");
            *self.open_request.lock().unwrap() = Some(request.clone());
            if let Some(err) = self.open_error.lock().unwrap().take() {
                return Err(err);
            }
            let targets = self.targets.lock().unwrap().clone().unwrap_or_else(|| {
                request
                    .batch_file
                    .file_parts
                    .iter()
                    .map(|p| target(p.ordinal_number))
                    .collect()
            });
            Ok(OpenBatchSessionResponse {
                reference_number: "20260101-SB-0000000001-01".into(),
                part_upload_requests: targets,
            })
        })
    }

    fn close_batch_session<'a>(
        &'a self,
        _reference_number: &'a str,
    ) -> BoxFut<'a, Result<(), ApiError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("close");
            match self.close_error.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }

    fn session_status<'a>(
        &'a self,
        _reference_number: &'a str,
    ) -> BoxFut<'a, Result<SessionStatus, ApiError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("status");
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Decode("no scripted status".into())))
        })
    }
}

// ---------------------------------------------------------------------------
// Uploader
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MockUploader {
    uploads: Mutex<Vec<(u32, Vec<u8>)>>,
    failing: Mutex<Vec<u32>>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
    cancel_after_first: Mutex<Option<CancellationToken>>,
}

impl MockUploader {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing(ordinals: &[u32]) -> Arc<Self> {
        Arc::new(Self {
            failing: Mutex::new(ordinals.to_vec()),
            ..Self::default()
        })
    }

    pub(crate) fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    pub(crate) fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub(crate) fn cancel_after_first(&self, token: CancellationToken) {
        *self.cancel_after_first.lock().unwrap() = Some(token);
    }

    pub(crate) fn uploads(&self) -> Vec<(u32, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl PartUploader for MockUploader {
    fn upload_part<'a>(
        &'a self,
        target: &'a UploadTarget,
        body: &'a [u8],
    ) -> BoxFut<'a, Result<(), ApiError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(token) = self.cancel_after_first.lock().unwrap().take() {
                token.cancel();
            }

            let ordinal = target.ordinal_number;
            if self.failing.lock().unwrap().contains(&ordinal) {
                return Err(ApiError::Status {
                    status: 500,
                    message: format!("storage error for part {ordinal}"),
                    retry_after: None,
                });
            }
            self.uploads.lock().unwrap().push((ordinal, body.to_vec()));
            Ok(())
        })
    }
}

/// Unwraps the session key with the fixture private key and decrypts the
/// uploaded bodies in ordinal order.
pub(crate) fn decrypt_uploads(
    request: &OpenBatchSessionRequest,
    uploads: &[(u32, Vec<u8>)],
) -> Vec<u8> {
    let wrapped = STANDARD
        .decode(&request.encryption.encrypted_symmetric_key)
        .unwrap();
    let key: [u8; 32] = test_support::private_key()
        .decrypt(Oaep::new::<Sha256>(), &wrapped)
        .unwrap()
        .try_into()
        .unwrap();
    let iv: [u8; 16] = STANDARD
        .decode(&request.encryption.initialization_vector)
        .unwrap()
        .try_into()
        .unwrap();

    let mut sorted = uploads.to_vec();
    sorted.sort_by_key(|(o, _)| *o);
    sorted
        .iter()
        .flat_map(|(_, body)| intake_crypto::decrypt_cbc(&key, &iv, body).unwrap())
        .collect()
}
