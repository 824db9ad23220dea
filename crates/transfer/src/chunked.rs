use std::ops::Range;

use intake_crypto::EncryptionSession;
use tracing::debug;

use crate::PackageError;
use crate::types::{BatchPart, ChunkedPackage, PackageMetadata, PartMetadata};

// ---------------------------------------------------------------------------
// Range planning
// ---------------------------------------------------------------------------

/// Plans contiguous byte ranges for splitting `len` bytes into at most
/// `part_count` parts.
///
/// Every range except the last is `ceil(len / part_count)` bytes. When that
/// size leaves nothing for the trailing parts (more parts requested than the
/// payload can fill), fewer ranges are returned. No range is ever empty.
pub fn part_ranges(len: usize, part_count: usize) -> Result<Vec<Range<usize>>, PackageError> {
    if part_count == 0 {
        return Err(PackageError::InvalidPartCount(part_count));
    }
    if len == 0 {
        return Err(PackageError::EmptyPayload);
    }
    if part_count == 1 {
        return Ok(vec![0..len]);
    }

    let chunk_size = len.div_ceil(part_count);
    let mut ranges = Vec::with_capacity(part_count);
    let mut start = 0;
    while start < len {
        let end = (start + chunk_size).min(len);
        ranges.push(start..end);
        start = end;
    }
    Ok(ranges)
}

// ---------------------------------------------------------------------------
// Split / decrypt
// ---------------------------------------------------------------------------

/// Splits `payload` into ordered parts, each encrypted independently with
/// the session key.
///
/// Every part reuses the session's key *and* IV. The intake service
/// decrypts parts that way, so a per-part IV would break interoperability;
/// it is a known weakness of the protocol.
pub fn split(
    payload: &[u8],
    session: &EncryptionSession,
    part_count: usize,
) -> Result<ChunkedPackage, PackageError> {
    let ranges = part_ranges(payload.len(), part_count)?;
    if ranges.len() < part_count {
        debug!(
            requested = part_count,
            actual = ranges.len(),
            "payload too small for requested part count"
        );
    }

    let parts = ranges
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let plain = &payload[range];
            let encrypted = session.encrypt(plain);
            BatchPart {
                ordinal_number: i as u32 + 1,
                plain_size: plain.len() as u64,
                metadata: PartMetadata::of(&encrypted),
                payload: encrypted,
            }
        })
        .collect::<Vec<_>>();

    Ok(ChunkedPackage {
        metadata: PackageMetadata::of(payload),
        parts,
    })
}

/// Decrypts a single part back into its plaintext byte range.
pub fn decrypt_part(part: &BatchPart, session: &EncryptionSession) -> Result<Vec<u8>, PackageError> {
    session
        .decrypt(&part.payload)
        .map_err(|source| PackageError::Decrypt {
            ordinal: part.ordinal_number,
            source,
        })
}
