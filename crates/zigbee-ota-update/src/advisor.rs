//! Update availability checks for devices
//!
//! [`UpdateAdvisor`] is the outward-facing entry point. It resolves a device
//! through the vendor tables, consults the cached index, and reports the
//! result as an [`UpdateAvailability`]. Its `check_*` operations never
//! return an error: every failure becomes [`UpdateAvailability::Unavailable`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::{IndexCache, IndexSnapshot};
use crate::record::{DeviceIdentity, FirmwareImageRecord};
use crate::selector;
use crate::stats::IndexStats;
use crate::vendor::{OtaTarget, VendorTable, VendorTables};

/// Identification a device reports through its Basic cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Manufacturer name, e.g. `_TZ3000_kdi2o9m6`
    pub manufacturer_name: Option<String>,
    /// Model id, e.g. `TS0601`
    pub model_id: Option<String>,
    /// Hardware version
    pub hardware_version: Option<u16>,
}

/// Device being checked for updates
///
/// Implemented by the host platform's device wrapper.
#[async_trait]
pub trait OtaDevice: Send + Sync {
    /// Identification settings of the device
    fn settings(&self) -> DeviceSettings;

    /// Read the running firmware version from the OTA upgrade cluster on the
    /// device's first endpoint. `Ok(None)` means the cluster is not exposed.
    async fn current_file_version(&self) -> anyhow::Result<Option<u32>>;
}

/// An [`OtaDevice`] built from values the caller already holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// Identification settings
    pub settings: DeviceSettings,
    /// Running firmware version, if known
    pub current_file_version: Option<u32>,
}

impl DeviceSnapshot {
    /// Create a snapshot with no identification
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the manufacturer name
    pub fn with_manufacturer_name(mut self, name: impl Into<String>) -> Self {
        self.settings.manufacturer_name = Some(name.into());
        self
    }

    /// Set the model id
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.settings.model_id = Some(model_id.into());
        self
    }

    /// Set the hardware version
    pub fn with_hardware_version(mut self, hardware_version: u16) -> Self {
        self.settings.hardware_version = Some(hardware_version);
        self
    }

    /// Set the running firmware version
    pub fn with_current_file_version(mut self, version: u32) -> Self {
        self.current_file_version = Some(version);
        self
    }
}

#[async_trait]
impl OtaDevice for DeviceSnapshot {
    fn settings(&self) -> DeviceSettings {
        self.settings.clone()
    }

    async fn current_file_version(&self) -> anyhow::Result<Option<u32>> {
        Ok(self.current_file_version)
    }
}

/// Image offered to a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOffer {
    /// Display name of the vendor table that resolved the device
    pub manufacturer: String,
    /// Version the device runs now
    pub current_version: u32,
    /// Version of the offered image
    pub new_version: u32,
    /// Image file name
    pub file_name: String,
    /// Image size in bytes
    pub file_size: u32,
    /// Download URL
    pub url: String,
    /// Published SHA-512 digest, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
}

impl UpdateOffer {
    fn new(table: &VendorTable, current_version: u32, record: &FirmwareImageRecord) -> Self {
        Self {
            manufacturer: table.name().to_string(),
            current_version,
            new_version: record.file_version,
            file_name: record.file_name.clone(),
            file_size: record.file_size,
            url: record.url.clone(),
            sha512: record.sha512.clone(),
        }
    }
}

/// Why no image was offered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// No vendor table knows the device
    UnsupportedDevice,
    /// The device is known but no image qualifies
    NoUpdate,
    /// The check failed; carries the error message
    Error(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::UnsupportedDevice => f.write_str("unsupported device"),
            UnavailableReason::NoUpdate => f.write_str("no update available"),
            UnavailableReason::Error(message) => f.write_str(message),
        }
    }
}

impl Serialize for UnavailableReason {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Result of an update or downgrade check
///
/// Serializes flat with an `available` flag: the offer fields when an image
/// is available, otherwise `reason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAvailability {
    /// An image is available
    Available(UpdateOffer),
    /// Nothing to offer
    Unavailable {
        /// Why
        reason: UnavailableReason,
    },
}

impl Serialize for UpdateAvailability {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct Flagged<'a, T> {
            available: bool,
            #[serde(flatten)]
            fields: &'a T,
        }

        #[derive(Serialize)]
        struct Reason<'a> {
            reason: &'a UnavailableReason,
        }

        match self {
            UpdateAvailability::Available(offer) => Flagged {
                available: true,
                fields: offer,
            }
            .serialize(serializer),
            UpdateAvailability::Unavailable { reason } => Flagged {
                available: false,
                fields: &Reason { reason },
            }
            .serialize(serializer),
        }
    }
}

impl UpdateAvailability {
    fn unavailable(reason: UnavailableReason) -> Self {
        UpdateAvailability::Unavailable { reason }
    }

    /// Whether an image is available
    pub fn is_available(&self) -> bool {
        matches!(self, UpdateAvailability::Available(_))
    }

    /// The offer, if an image is available
    pub fn offer(&self) -> Option<&UpdateOffer> {
        match self {
            UpdateAvailability::Available(offer) => Some(offer),
            UpdateAvailability::Unavailable { .. } => None,
        }
    }

    /// The reason, if no image is available
    pub fn reason(&self) -> Option<&UnavailableReason> {
        match self {
            UpdateAvailability::Available(_) => None,
            UpdateAvailability::Unavailable { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Upgrade,
    Downgrade,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Upgrade => "update",
            Direction::Downgrade => "downgrade",
        }
    }
}

/// Decides whether devices have firmware images available
#[derive(Debug)]
pub struct UpdateAdvisor {
    index: Arc<IndexCache>,
    tables: VendorTables,
}

impl UpdateAdvisor {
    /// Create an advisor over `index`, consulting `tables` in order.
    pub fn new(index: Arc<IndexCache>, tables: VendorTables) -> Self {
        Self { index, tables }
    }

    /// Create an advisor with the built-in Tuya and Xiaomi/Aqara tables.
    pub fn with_default_tables(index: Arc<IndexCache>) -> Self {
        Self::new(index, VendorTables::default())
    }

    /// Index cache the advisor reads from
    pub fn index(&self) -> &Arc<IndexCache> {
        &self.index
    }

    /// Vendor tables the advisor resolves devices with
    pub fn tables(&self) -> &VendorTables {
        &self.tables
    }

    /// Check whether a newer image is available for `device`.
    ///
    /// Devices no table resolves are reported as unsupported without any
    /// network call. An unreadable firmware version counts as 0.
    pub async fn check_for_update<D: OtaDevice + ?Sized>(&self, device: &D) -> UpdateAvailability {
        self.check(device, Direction::Upgrade).await
    }

    /// Check whether an older image is available for `device`.
    pub async fn check_for_downgrade<D: OtaDevice + ?Sized>(
        &self,
        device: &D,
    ) -> UpdateAvailability {
        self.check(device, Direction::Downgrade).await
    }

    /// Best upgrade for an identity whose codes are already known.
    ///
    /// # Errors
    ///
    /// Propagates index fetch failures.
    pub async fn find_upgrade(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<Option<FirmwareImageRecord>> {
        let index = self.index.fetch_index(false).await?;
        Ok(selector::select_upgrade(identity, &index).cloned())
    }

    /// Closest downgrade for an identity whose codes are already known.
    ///
    /// # Errors
    ///
    /// Currently infallible: an unreachable downgrade index reads as empty.
    pub async fn find_downgrade(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<Option<FirmwareImageRecord>> {
        let index = self.index.fetch_downgrade_index(false).await;
        Ok(selector::select_downgrade(identity, &index).cloned())
    }

    /// Statistics over the primary index, grouped by the advisor's families.
    ///
    /// # Errors
    ///
    /// Propagates index fetch failures.
    pub async fn index_stats(&self) -> Result<IndexStats> {
        let index = self.index.fetch_index(false).await?;
        Ok(IndexStats::compute(
            &index,
            self.tables.families(),
            self.index.primary_cache_age(),
        ))
    }

    async fn check<D: OtaDevice + ?Sized>(
        &self,
        device: &D,
        direction: Direction,
    ) -> UpdateAvailability {
        match self.try_check(device, direction).await {
            Ok(availability) => availability,
            Err(e) => {
                warn!("OTA {} check failed: {}", direction.label(), e);
                UpdateAvailability::unavailable(UnavailableReason::Error(e.to_string()))
            }
        }
    }

    async fn try_check<D: OtaDevice + ?Sized>(
        &self,
        device: &D,
        direction: Direction,
    ) -> Result<UpdateAvailability> {
        let settings = device.settings();
        let resolved: Vec<(&VendorTable, OtaTarget)> = self
            .tables
            .resolve(
                settings.manufacturer_name.as_deref(),
                settings.model_id.as_deref(),
            )
            .collect();

        if resolved.is_empty() {
            debug!(
                "No vendor table for manufacturer {:?}, model {:?}",
                settings.manufacturer_name, settings.model_id
            );
            return Ok(UpdateAvailability::unavailable(
                UnavailableReason::UnsupportedDevice,
            ));
        }

        let current_version = read_current_version(device).await;
        let index = self.index_for(direction).await?;

        for (table, target) in resolved {
            let identity = identity_for(target, current_version, &settings);
            let selected = match direction {
                Direction::Upgrade => selector::select_upgrade(&identity, &index),
                Direction::Downgrade => selector::select_downgrade(&identity, &index),
            };

            if let Some(record) = selected {
                info!(
                    "OTA {} available from {}: {} -> {} ({})",
                    direction.label(),
                    table.name(),
                    current_version,
                    record.file_version,
                    record.file_name
                );
                return Ok(UpdateAvailability::Available(UpdateOffer::new(
                    table,
                    current_version,
                    record,
                )));
            }
        }

        Ok(UpdateAvailability::unavailable(UnavailableReason::NoUpdate))
    }

    async fn index_for(&self, direction: Direction) -> Result<IndexSnapshot> {
        match direction {
            Direction::Upgrade => self.index.fetch_index(false).await,
            Direction::Downgrade => Ok(self.index.fetch_downgrade_index(false).await),
        }
    }
}

async fn read_current_version<D: OtaDevice + ?Sized>(device: &D) -> u32 {
    match device.current_file_version().await {
        Ok(Some(version)) => version,
        Ok(None) => 0,
        Err(e) => {
            debug!("Could not read current firmware version, assuming 0: {}", e);
            0
        }
    }
}

fn identity_for(
    target: OtaTarget,
    current_version: u32,
    settings: &DeviceSettings,
) -> DeviceIdentity {
    DeviceIdentity {
        manufacturer_code: target.manufacturer_code,
        image_type: target.image_type,
        current_file_version: current_version,
        model_id: settings.model_id.clone(),
        manufacturer_name: settings.manufacturer_name.clone(),
        hardware_version: settings.hardware_version,
    }
}
