use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::Rng;
use rsa::RsaPublicKey;
use zeroize::Zeroizing;

use crate::{CryptoError, IV_LEN, SYMMETRIC_KEY_LEN, aes_cbc, key_wrap};

/// One-time key material for a transfer session.
///
/// Holds the raw AES key and IV in memory only, alongside the base64 forms
/// sent in the session-open request. The raw key is zeroed on drop.
pub struct EncryptionSession {
    key: Zeroizing<[u8; SYMMETRIC_KEY_LEN]>,
    iv: [u8; IV_LEN],
    wrapped_key: String,
    wrapped_iv: String,
}

impl EncryptionSession {
    /// Generates a random 256-bit key and 128-bit IV and wraps the key for
    /// the holder of `public_key`.
    pub fn generate(public_key: &RsaPublicKey) -> Result<Self, CryptoError> {
        let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_LEN]);
        let mut iv = [0u8; IV_LEN];
        let mut rng = rand::thread_rng();
        rng.fill(&mut key[..]);
        rng.fill(&mut iv[..]);
        Self::from_key_material(key, iv, public_key)
    }

    /// Builds a session from caller-chosen key material.
    pub fn from_key_material(
        key: Zeroizing<[u8; SYMMETRIC_KEY_LEN]>,
        iv: [u8; IV_LEN],
        public_key: &RsaPublicKey,
    ) -> Result<Self, CryptoError> {
        let wrapped = key_wrap::wrap_key(public_key, &key[..])?;
        Ok(Self {
            wrapped_key: STANDARD.encode(wrapped),
            wrapped_iv: STANDARD.encode(iv),
            key,
            iv,
        })
    }

    pub fn symmetric_key(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.key
    }

    pub fn initialization_vector(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Base64 of the RSA-OAEP wrapped key.
    pub fn wrapped_key(&self) -> &str {
        &self.wrapped_key
    }

    /// Base64 of the IV. The protocol sends the IV in the clear.
    pub fn wrapped_iv(&self) -> &str {
        &self.wrapped_iv
    }

    /// Encrypts with this session's key and IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        aes_cbc::encrypt_cbc(&self.key, &self.iv, plaintext)
    }

    /// Decrypts data produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        aes_cbc::decrypt_cbc(&self.key, &self.iv, ciphertext)
    }
}

impl fmt::Debug for EncryptionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionSession")
            .field("key", &"<redacted>")
            .field("wrapped_iv", &self.wrapped_iv)
            .finish_non_exhaustive()
    }
}
