use std::sync::Arc;

use intake_certs::CertificateMaterialCache;
use intake_crypto::EncryptionSession;
use tracing::debug;

use crate::error::TransferError;

/// Creates the one-time key material for a transfer.
pub struct SessionEncryptionPlanner {
    cache: Arc<CertificateMaterialCache>,
}

impl SessionEncryptionPlanner {
    pub fn new(cache: Arc<CertificateMaterialCache>) -> Self {
        Self { cache }
    }

    /// Generates a fresh key and IV, wrapping the key under the current
    /// symmetric-key-encryption certificate.
    ///
    /// Fails with [`TransferError::CredentialUnavailable`] until the cache
    /// has loaded certificates.
    pub fn create_session(&self) -> Result<EncryptionSession, TransferError> {
        let cert = self.cache.symmetric_key_certificate()?;
        let session = EncryptionSession::generate(&cert.public_key)?;
        debug!(certificate = %cert.fingerprint(), "encryption session created");
        Ok(session)
    }
}
