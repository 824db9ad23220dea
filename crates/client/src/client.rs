use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use intake_certs::{CertError, CertificateSource};
use intake_protocol::{
    OpenBatchSessionRequest, OpenBatchSessionResponse, PemCertificateInfo, SessionStatus,
    SessionStatusResponse, UploadTarget,
};
use intake_session::{ApiError, IntakeApi, PartUploader};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::response::{error_from_response, transport_error};
use crate::{ClientConfig, ClientError};

/// Characters escaped in a path segment. Reference numbers keep their dashes.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Intake service client.
#[derive(Clone)]
pub struct IntakeClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    timeout: Duration,
    min_upload_rate: u64,
}

impl IntakeClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        if config.access_token.is_empty() {
            return Err(ClientError::MissingToken);
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            timeout: config.timeout,
            min_upload_rate: config.min_upload_rate.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists the service's public encryption certificates.
    pub async fn public_certificates(&self) -> Result<Vec<PemCertificateInfo>, ApiError> {
        let resp = self
            .authorized(Method::GET, "/security/public-key-certificates")
            .send()
            .await
            .map_err(transport_error)?;
        read_json(resp).await
    }

    /// Opens a batch session.
    pub async fn open_session(
        &self,
        request: &OpenBatchSessionRequest,
    ) -> Result<OpenBatchSessionResponse, ApiError> {
        let resp = self
            .authorized(Method::POST, "/sessions/batch")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(resp).await
    }

    /// Closes a batch session.
    pub async fn close_session(&self, reference_number: &str) -> Result<(), ApiError> {
        let path = format!("/sessions/batch/{}/close", encode_segment(reference_number));
        let resp = self
            .authorized(Method::POST, &path)
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(())
    }

    /// Reads a session's processing status.
    pub async fn status(&self, reference_number: &str) -> Result<SessionStatus, ApiError> {
        let path = format!("/sessions/{}", encode_segment(reference_number));
        let resp = self
            .authorized(Method::GET, &path)
            .send()
            .await
            .map_err(transport_error)?;
        let status: SessionStatusResponse = read_json(resp).await?;
        Ok(status.into())
    }

    /// Sends one encrypted part as the target describes.
    ///
    /// Upload targets are pre-authorized URLs: only the target's own headers
    /// are sent, never the access token.
    pub async fn upload(&self, target: &UploadTarget, body: &[u8]) -> Result<(), ApiError> {
        let method = Method::from_bytes(target.method.as_bytes()).map_err(|_| {
            ApiError::Decode(format!("invalid upload method {:?}", target.method))
        })?;
        let mut req = self.http.request(method, &target.url);
        for (name, value) in &target.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let resp = req
            .timeout(self.upload_timeout(body.len()))
            .body(body.to_vec())
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        debug!(ordinal = target.ordinal_number, size = body.len(), "part accepted");
        Ok(())
    }

    /// Request timeout plus the transfer time of `len` bytes at the
    /// minimum upload rate.
    fn upload_timeout(&self, len: usize) -> Duration {
        let transfer = Duration::from_secs((len as u64).div_ceil(self.min_upload_rate));
        self.timeout.saturating_add(transfer)
    }

    fn authorized(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
    }
}

impl CertificateSource for IntakeClient {
    fn fetch_public_certificates<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PemCertificateInfo>, CertError>> + Send + 'a>> {
        Box::pin(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CertError::Cancelled),
                result = self.public_certificates() => {
                    result.map_err(|e| CertError::Fetch(e.to_string()))
                }
            }
        })
    }
}

impl IntakeApi for IntakeClient {
    fn open_batch_session<'a>(
        &'a self,
        request: &'a OpenBatchSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OpenBatchSessionResponse, ApiError>> + Send + 'a>> {
        Box::pin(self.open_session(request))
    }

    fn close_batch_session<'a>(
        &'a self,
        reference_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        Box::pin(self.close_session(reference_number))
    }

    fn session_status<'a>(
        &'a self,
        reference_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SessionStatus, ApiError>> + Send + 'a>> {
        Box::pin(self.status(reference_number))
    }
}

impl PartUploader for IntakeClient {
    fn upload_part<'a>(
        &'a self,
        target: &'a UploadTarget,
        body: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        Box::pin(self.upload(target, body))
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    if !resp.status().is_success() {
        return Err(error_from_response(resp).await);
    }
    let body = resp.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}
