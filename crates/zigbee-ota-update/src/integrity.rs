//! SHA-512 integrity verification for downloaded images

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::IntegrityError;

/// Lowercase hex SHA-512 digest of `bytes`
pub fn sha512_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Check `bytes` against an expected hex digest.
///
/// With no expected digest the check is skipped and succeeds. Otherwise the
/// expected digest is compared case-insensitively and in constant time;
/// anything that is not the exact digest, including a malformed or
/// wrong-length string, fails.
///
/// # Errors
///
/// Returns [`IntegrityError`] carrying both digests on mismatch.
pub fn verify(bytes: &[u8], expected_hex: Option<&str>) -> Result<(), IntegrityError> {
    let Some(expected) = expected_hex else {
        debug!("No SHA512 published, skipping integrity check");
        return Ok(());
    };

    let actual = sha512_hex(bytes);
    let expected = expected.trim().to_ascii_lowercase();

    // ct_eq is false for slices of different lengths
    if bool::from(actual.as_bytes().ct_eq(expected.as_bytes())) {
        debug!("SHA512 verified ({} bytes)", bytes.len());
        Ok(())
    } else {
        warn!("SHA512 mismatch for {} byte image", bytes.len());
        Err(IntegrityError { expected, actual })
    }
}
