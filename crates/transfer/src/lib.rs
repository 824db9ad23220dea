//! Splits a document package into size-bounded, independently encrypted
//! parts and checks it against the intake protocol's limits.

mod chunked;
mod types;
mod validation;

pub use chunked::{decrypt_part, part_ranges, split};
pub use types::{BatchPart, ChunkedPackage, PackageMetadata, PartMetadata};
pub use validation::{recommended_part_count, validate_limits};

/// Maximum unencrypted package size: 5 GiB.
pub const MAX_PACKAGE_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts per session.
pub const MAX_PARTS: usize = 50;

/// Maximum unencrypted size of a single part: 100 MiB.
pub const MAX_PART_SIZE: u64 = 100 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("package is empty")]
    EmptyPayload,

    #[error("part count must be at least 1, got {0}")]
    InvalidPartCount(usize),

    #[error("package of {size} bytes exceeds the {max} byte limit")]
    PackageTooLarge { size: u64, max: u64 },

    #[error("{count} parts exceed the limit of {max}")]
    TooManyParts { count: usize, max: usize },

    #[error("part {ordinal} is {size} bytes before encryption, limit is {max}")]
    PartTooLarge { ordinal: u32, size: u64, max: u64 },

    #[error("part {ordinal}: {source}")]
    Decrypt {
        ordinal: u32,
        #[source]
        source: intake_crypto::CryptoError,
    },
}
