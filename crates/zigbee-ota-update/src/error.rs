//! Error types for OTA index, download and verification operations

use thiserror::Error;

pub use zigbee_ota_header::FormatError;

/// Transport-level failures talking to an index or image host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Request could not be sent or the body could not be read
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying transport error message
        message: String,
    },

    /// Server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    ClientInit(String),
}

/// Index document could not be decoded
#[derive(Error, Debug)]
#[error("Failed to parse OTA index from {url}: {source}")]
pub struct ParseError {
    /// Index URL the document came from
    pub url: String,
    /// JSON decoding error
    #[source]
    pub source: serde_json::Error,
}

/// Downloaded bytes do not match the expected SHA-512 digest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("SHA512 mismatch: expected {expected}, got {actual}")]
pub struct IntegrityError {
    /// Digest the index advertised
    pub expected: String,
    /// Digest computed over the downloaded bytes
    pub actual: String,
}

/// Errors produced by the OTA update subsystem
#[derive(Error, Debug)]
pub enum OtaError {
    /// Network or HTTP failure
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Malformed index JSON
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Malformed OTA image header
    #[error("Invalid OTA image: {0}")]
    Format(#[from] FormatError),

    /// Digest mismatch
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Image header disagrees with the index record it was downloaded for
    #[error("OTA header {field} mismatch: index says {expected}, image says {found}")]
    RecordMismatch {
        /// Header field that disagrees
        field: &'static str,
        /// Value from the index record
        expected: u32,
        /// Value from the image header
        found: u32,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OtaError {
    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        OtaError::Config(msg.into())
    }

    /// Whether the error came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(self, OtaError::Network(_))
    }
}

/// A specialized `Result` type for OTA operations.
pub type Result<T> = std::result::Result<T, OtaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_code_and_url() {
        let err = OtaError::from(NetworkError::Status {
            url: "https://example.com/index.json".to_string(),
            status: 404,
        });
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com/index.json");
        assert!(err.is_network());
    }

    #[test]
    fn integrity_error_carries_both_digests() {
        let err = IntegrityError {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert_eq!(err.to_string(), "SHA512 mismatch: expected aa, got bb");
    }

    #[test]
    fn format_error_is_wrapped() {
        let err = OtaError::from(FormatError::BadMagic { found: 0x1234_5678 });
        assert_eq!(
            err.to_string(),
            "Invalid OTA image: Invalid OTA magic number: 0x12345678"
        );
        assert!(!err.is_network());
    }
}
