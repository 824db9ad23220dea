use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use x509_cert::Certificate;
use x509_cert::der::{Decode, Encode};

use crate::CryptoError;

/// Extracts the RSA public key from a DER-encoded X.509 certificate.
pub fn public_key_from_certificate(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let cert =
        Certificate::from_der(der).map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
    RsaPublicKey::from_public_key_der(&spki).map_err(|e| CryptoError::UnsupportedKey(e.to_string()))
}

/// Encrypts `key` under `public_key` with RSA-OAEP (SHA-256, MGF1-SHA-256).
pub fn wrap_key(public_key: &RsaPublicKey, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut rng = rand::thread_rng();
    public_key
        .encrypt(&mut rng, Oaep::new::<Sha256>(), key)
        .map_err(|e| CryptoError::WrapFailed(e.to_string()))
}
