//! Index records and device identities
//!
//! [`FirmwareImageRecord`] mirrors one entry of the zigbee-OTA `index.json`
//! (the upstream `RepoImageMeta` shape). [`DeviceIdentity`] is what a record
//! is matched against.

use serde::{Deserialize, Serialize};

/// One firmware image entry from the remote index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareImageRecord {
    /// Zigbee manufacturer code the image targets
    pub manufacturer_code: u16,

    /// Manufacturer-specific image type
    pub image_type: u16,

    /// Firmware file version
    pub file_version: u32,

    /// Image size in bytes
    pub file_size: u32,

    /// Download URL
    pub url: String,

    /// Image file name
    pub file_name: String,

    /// Hex SHA-512 digest of the image, when published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,

    /// Header string copied from the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ota_header_string: Option<String>,

    /// Offer this image regardless of version ordering
    #[serde(default)]
    pub force: bool,

    /// Lowest hardware version the image supports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_version_min: Option<u16>,

    /// Highest hardware version the image supports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_version_max: Option<u16>,

    /// Only offer to devices reporting this model id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Only offer to devices reporting one of these manufacturer names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_name: Option<Vec<String>>,

    /// Only offer to devices currently at or above this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_file_version: Option<u32>,

    /// Only offer to devices currently at or below this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_version: Option<u32>,

    /// Vendor URL the image was mirrored from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,

    /// Release notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
}

impl FirmwareImageRecord {
    /// Create a record with no restriction or provenance fields.
    pub fn new(
        manufacturer_code: u16,
        image_type: u16,
        file_version: u32,
        url: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let file_name = url.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            manufacturer_code,
            image_type,
            file_version,
            file_size: 0,
            url,
            file_name,
            sha512: None,
            ota_header_string: None,
            force: false,
            hardware_version_min: None,
            hardware_version_max: None,
            model_id: None,
            manufacturer_name: None,
            min_file_version: None,
            max_file_version: None,
            original_url: None,
            release_notes: None,
        }
    }

    /// Whether the record targets the given manufacturer code and image type.
    pub fn targets(&self, manufacturer_code: u16, image_type: u16) -> bool {
        self.manufacturer_code == manufacturer_code && self.image_type == image_type
    }
}

/// Identity of a device being checked for updates
///
/// Optional fields left as `None` never restrict matching.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Zigbee manufacturer code
    pub manufacturer_code: u16,
    /// OTA image type
    pub image_type: u16,
    /// Firmware version currently running on the device
    pub current_file_version: u32,
    /// Model id reported by the Basic cluster
    pub model_id: Option<String>,
    /// Manufacturer name reported by the Basic cluster
    pub manufacturer_name: Option<String>,
    /// Hardware version reported by the Basic cluster
    pub hardware_version: Option<u16>,
}

impl DeviceIdentity {
    /// Create an identity with no optional context.
    pub fn new(manufacturer_code: u16, image_type: u16, current_file_version: u32) -> Self {
        Self {
            manufacturer_code,
            image_type,
            current_file_version,
            ..Default::default()
        }
    }

    /// Set the model id
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Set the manufacturer name
    pub fn with_manufacturer_name(mut self, manufacturer_name: impl Into<String>) -> Self {
        self.manufacturer_name = Some(manufacturer_name.into());
        self
    }

    /// Set the hardware version
    pub fn with_hardware_version(mut self, hardware_version: u16) -> Self {
        self.hardware_version = Some(hardware_version);
        self
    }
}
