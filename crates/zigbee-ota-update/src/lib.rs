//! Zigbee OTA firmware discovery and verification
//!
//! This crate answers one question for a fleet of Tuya and Xiaomi/Aqara
//! devices: given what a device reports about itself, is there a newer (or
//! older) firmware image in the Koenkk/zigbee-OTA index, and where is it?
//!
//! - TTL-cached upgrade and downgrade indexes
//! - Restriction-aware candidate selection with deterministic tie-breaks
//! - Image downloads with an in-process byte cache
//! - SHA-512 verification and OTA header checks on downloaded images
//!
//! # Architecture
//!
//! - [`index`]: index fetching and caching
//! - [`selector`]: pure upgrade/downgrade selection
//! - [`fetcher`]: image download and the verified download pipeline
//! - [`integrity`]: SHA-512 digest checks
//! - [`vendor`]: manufacturer name / model id lookup tables
//! - [`advisor`]: the error-absorbing entry point for device checks
//! - [`transport`]: the HTTP seam
//! - [`error`]: error types
//!
//! Binary header parsing lives in the `zigbee-ota-header` crate.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zigbee_ota_update::prelude::*;
//!
//! # async fn example() -> zigbee_ota_update::Result<()> {
//! let index = Arc::new(IndexCache::with_reqwest(OtaSourceConfig::default())?);
//! let advisor = UpdateAdvisor::with_default_tables(Arc::clone(&index));
//!
//! let device = DeviceSnapshot::new()
//!     .with_manufacturer_name("_TZE200_ar0slwnd")
//!     .with_model_id("TS0601")
//!     .with_current_file_version(65);
//!
//! match advisor.check_for_update(&device).await {
//!     UpdateAvailability::Available(offer) => {
//!         println!("{} -> {}", offer.current_version, offer.new_version)
//!     }
//!     UpdateAvailability::Unavailable { reason } => println!("{reason}"),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod advisor;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod integrity;
pub mod prelude;
pub mod record;
pub mod selector;
pub mod stats;
pub mod transport;
pub mod vendor;

#[cfg(test)]
mod test_support;

pub use advisor::{
    DeviceSettings, DeviceSnapshot, OtaDevice, UnavailableReason, UpdateAdvisor,
    UpdateAvailability, UpdateOffer,
};
pub use config::OtaSourceConfig;
pub use error::{OtaError, Result};
pub use fetcher::{ImageFetcher, VerifiedImage};
pub use index::IndexCache;
pub use record::{DeviceIdentity, FirmwareImageRecord};
pub use zigbee_ota_header::OtaHeader;
