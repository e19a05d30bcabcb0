//! Image downloads with an in-process byte cache
//!
//! Images are cached by exact URL for the lifetime of the fetcher. There is
//! no eviction beyond [`ImageFetcher::clear_cache`] and the eviction done by
//! [`ImageFetcher::download_verified`] after a digest mismatch.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use zigbee_ota_header::OtaHeader;

use crate::config::OtaSourceConfig;
use crate::error::{NetworkError, OtaError, Result};
use crate::integrity;
use crate::record::FirmwareImageRecord;
use crate::transport::{HttpTransport, ReqwestTransport};

/// A downloaded image that passed every available check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedImage {
    /// Raw image bytes, header included
    pub bytes: Bytes,
    /// Parsed OTA header
    pub header: OtaHeader,
    /// `false` when the record published no digest and the integrity check
    /// was skipped
    pub digest_checked: bool,
}

/// Downloads OTA images and keeps their bytes in memory
pub struct ImageFetcher {
    transport: Arc<dyn HttpTransport>,
    cache: RwLock<HashMap<String, Bytes>>,
}

impl ImageFetcher {
    /// Create a fetcher that downloads through `transport`.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fetcher with a `reqwest` transport built from `config`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the HTTP client cannot be built.
    pub fn with_reqwest(config: &OtaSourceConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Return the image at `url`, from the cache when present.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] on transport failure or non-2xx status.
    /// Nothing is cached on failure.
    pub async fn download_image(&self, url: &str) -> std::result::Result<Bytes, NetworkError> {
        if let Some(bytes) = self.cache.read().get(url).cloned() {
            debug!("Using cached OTA image {} ({} bytes)", url, bytes.len());
            return Ok(bytes);
        }

        info!("Downloading OTA image: {}", url);
        let bytes = self.transport.get(url).await?;
        self.cache.write().insert(url.to_string(), bytes.clone());
        info!("Downloaded OTA image: {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Download the image for `record` and check it against the record.
    ///
    /// Runs the integrity check against `record.sha512`, parses the OTA
    /// header, and requires the header's manufacturer code, image type and
    /// file version to equal the record's.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. On a digest mismatch the
    /// cached bytes are dropped so the next call downloads afresh.
    pub async fn download_verified(&self, record: &FirmwareImageRecord) -> Result<VerifiedImage> {
        let bytes = self.download_image(&record.url).await?;

        if let Err(e) = integrity::verify(&bytes, record.sha512.as_deref()) {
            self.cache.write().remove(&record.url);
            warn!("Evicted OTA image {} after integrity failure", record.url);
            return Err(e.into());
        }

        let header = zigbee_ota_header::parse(&bytes)?;
        check_field(
            "manufacturer_code",
            record.manufacturer_code.into(),
            header.manufacturer_code.into(),
        )?;
        check_field(
            "image_type",
            record.image_type.into(),
            header.image_type.into(),
        )?;
        check_field("file_version", record.file_version, header.file_version)?;

        Ok(VerifiedImage {
            bytes,
            header,
            digest_checked: record.sha512.is_some(),
        })
    }

    /// Drop every cached image.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
        info!("OTA image cache cleared");
    }

    /// Number of cached images
    pub fn cached_image_count(&self) -> usize {
        self.cache.read().len()
    }
}

impl std::fmt::Debug for ImageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFetcher")
            .field("cached_images", &self.cached_image_count())
            .finish_non_exhaustive()
    }
}

fn check_field(field: &'static str, expected: u32, found: u32) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(OtaError::RecordMismatch {
            field,
            expected,
            found,
        })
    }
}
