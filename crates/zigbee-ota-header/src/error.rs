//! Error types for OTA header decoding

use thiserror::Error;

/// Errors returned while decoding an OTA upgrade file header
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// Buffer is shorter than the fixed header prefix
    #[error("Image too small to contain OTA header: {len} bytes, need at least {min}")]
    TooShort {
        /// Length of the supplied buffer
        len: usize,
        /// Minimum length required
        min: usize,
    },

    /// Upgrade file identifier is not `0x0BEEF11E`
    #[error("Invalid OTA magic number: 0x{found:08X}")]
    BadMagic {
        /// Identifier found at offset 0
        found: u32,
    },
}
