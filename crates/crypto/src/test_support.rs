//! Fixed RSA-2048 server certificate for tests.
//!
//! Not for production use: the private key is checked into the repository.

use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::RsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;

const CERTIFICATE_B64: &str = include_str!("../testdata/server_cert.der.b64");
const PRIVATE_KEY_PEM: &str = include_str!("../testdata/server_key.pem");

/// Base64 of the DER certificate, as the certificate listing returns it.
pub fn certificate_base64() -> String {
    CERTIFICATE_B64.trim().to_string()
}

pub fn certificate_der() -> Vec<u8> {
    STANDARD
        .decode(CERTIFICATE_B64.trim())
        .expect("fixture certificate is valid base64")
}

/// Private key matching [`certificate_der`], for unwrapping in assertions.
pub fn private_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(PRIVATE_KEY_PEM).expect("fixture key is valid PKCS#8")
}
