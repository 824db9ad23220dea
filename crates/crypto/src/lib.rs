//! Envelope encryption primitives for batch intake sessions.
//!
//! Bulk data is encrypted with AES-256-CBC under a random per-session key.
//! The key is wrapped with RSA-OAEP-SHA256 under the public key of the
//! server's symmetric-key-encryption certificate.

mod aes_cbc;
mod digest;
mod key_wrap;
mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use aes_cbc::{decrypt_cbc, encrypt_cbc};
pub use digest::{fingerprint_hex, sha256_base64};
pub use key_wrap::{public_key_from_certificate, wrap_key};
pub use rsa::RsaPublicKey;
pub use session::EncryptionSession;

/// AES-256 key length in bytes.
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// AES block / CBC IV length in bytes.
pub const IV_LEN: usize = 16;

/// Errors produced by the crypto crate.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("unsupported public key: {0}")]
    UnsupportedKey(String),

    #[error("key wrap failed: {0}")]
    WrapFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}
