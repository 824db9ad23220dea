/// Size and digest of bytes as transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartMetadata {
    pub size_bytes: i64,
    /// Base64 SHA-256.
    pub sha256_hash: String,
}

impl PartMetadata {
    /// Computes metadata for exactly `data`.
    pub fn of(data: &[u8]) -> Self {
        Self {
            size_bytes: data.len() as i64,
            sha256_hash: intake_crypto::sha256_base64(data),
        }
    }
}

/// Size and digest of the whole package before encryption.
pub type PackageMetadata = PartMetadata;

/// One encrypted part of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPart {
    /// 1-based position in the package.
    pub ordinal_number: u32,
    /// Size of the plaintext range this part was encrypted from.
    pub plain_size: u64,
    /// AES-256-CBC ciphertext.
    pub payload: Vec<u8>,
    /// Metadata of `payload`.
    pub metadata: PartMetadata,
}

/// Result of splitting a package.
#[derive(Debug, Clone)]
pub struct ChunkedPackage {
    pub metadata: PackageMetadata,
    /// Parts ordered by ordinal, starting at 1.
    pub parts: Vec<BatchPart>,
}

impl ChunkedPackage {
    /// Unencrypted package size in bytes.
    pub fn plain_size(&self) -> u64 {
        self.metadata.size_bytes as u64
    }

    pub fn part(&self, ordinal: u32) -> Option<&BatchPart> {
        self.parts.iter().find(|p| p.ordinal_number == ordinal)
    }
}
