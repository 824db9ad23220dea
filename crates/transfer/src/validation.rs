use crate::types::ChunkedPackage;
use crate::{MAX_PACKAGE_SIZE, MAX_PART_SIZE, MAX_PARTS, PackageError};

/// Checks a split package against the protocol limits.
///
/// Rejects:
/// - Packages over 5 GiB before encryption
/// - More than 50 parts
/// - Any part over 100 MiB before encryption
///
/// The server stays authoritative; this only avoids sending requests that
/// are certain to be refused.
pub fn validate_limits(package: &ChunkedPackage) -> Result<(), PackageError> {
    let size = package.plain_size();
    if size > MAX_PACKAGE_SIZE {
        return Err(PackageError::PackageTooLarge {
            size,
            max: MAX_PACKAGE_SIZE,
        });
    }

    if package.parts.len() > MAX_PARTS {
        return Err(PackageError::TooManyParts {
            count: package.parts.len(),
            max: MAX_PARTS,
        });
    }

    for part in &package.parts {
        if part.plain_size > MAX_PART_SIZE {
            return Err(PackageError::PartTooLarge {
                ordinal: part.ordinal_number,
                size: part.plain_size,
                max: MAX_PART_SIZE,
            });
        }
    }

    Ok(())
}

/// Smallest part count that keeps every part within [`MAX_PART_SIZE`].
pub fn recommended_part_count(len: u64) -> Result<usize, PackageError> {
    if len > MAX_PACKAGE_SIZE {
        return Err(PackageError::PackageTooLarge {
            size: len,
            max: MAX_PACKAGE_SIZE,
        });
    }
    let count = len.div_ceil(MAX_PART_SIZE).max(1) as usize;
    if count > MAX_PARTS {
        return Err(PackageError::TooManyParts {
            count,
            max: MAX_PARTS,
        });
    }
    Ok(count)
}
