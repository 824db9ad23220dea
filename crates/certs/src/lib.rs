//! Cache of the intake service's public encryption certificates.
//!
//! [`CertificateMaterialCache`] fetches the certificate listing through a
//! [`CertificateSource`], picks the symmetric-key and token certificates,
//! and keeps them fresh with a background refresh task. Readers always see
//! the last published snapshot and never wait on a refresh.

mod cache;
mod materials;

use std::future::Future;
use std::pin::Pin;

use intake_protocol::{CertificateUsage, PemCertificateInfo};
use tokio_util::sync::CancellationToken;

pub use cache::{CacheConfig, CertificateMaterialCache};
pub use materials::{CachedCertificate, CertificateMaterials};

/// Remote listing of the service's public certificates.
///
/// Implemented by the HTTP client; tests use in-memory mocks.
pub trait CertificateSource: Send + Sync {
    fn fetch_public_certificates<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PemCertificateInfo>, CertError>> + Send + 'a>>;
}

/// Errors produced by the certificate cache.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    /// No certificate material has ever been loaded successfully.
    #[error("certificate material unavailable")]
    CredentialUnavailable {
        #[source]
        source: Option<Box<CertError>>,
    },

    #[error("certificate fetch failed: {0}")]
    Fetch(String),

    #[error("no certificate tagged for {0:?}")]
    MissingUsage(CertificateUsage),

    #[error("certificate for {usage:?} is not valid base64: {message}")]
    Encoding {
        usage: CertificateUsage,
        message: String,
    },

    #[error("certificate for {usage:?}: {source}")]
    InvalidCertificate {
        usage: CertificateUsage,
        #[source]
        source: intake_crypto::CryptoError,
    },

    #[error("certificate fetch cancelled")]
    Cancelled,
}

impl CertError {
    pub(crate) fn unavailable(source: Option<CertError>) -> Self {
        Self::CredentialUnavailable {
            source: source.map(Box::new),
        }
    }
}
