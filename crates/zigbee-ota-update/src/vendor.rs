//! Vendor lookup tables
//!
//! A [`VendorTable`] maps what a device reports (manufacturer name, model id)
//! to the `(manufacturerCode, imageType)` pair its images are published
//! under. Tables are plain data: the built-in defaults cover the Tuya and
//! Xiaomi/Aqara families and can be replaced from JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OtaError, Result};
use crate::record::FirmwareImageRecord;

/// Zigbee manufacturer codes of the supported vendor families
pub mod codes {
    /// Tuya (0x1141)
    pub const TUYA: u16 = 0x1141;
    /// Tuya alternate (0x1002)
    pub const TUYA_ALT: u16 = 0x1002;
    /// Xiaomi (0x115F)
    pub const XIAOMI: u16 = 0x115F;
    /// Aqara (0x1037)
    pub const AQARA: u16 = 0x1037;
    /// LUMI (0x1136)
    pub const LUMI: u16 = 0x1136;
}

/// Manufacturer code and image type an index record is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtaTarget {
    /// Zigbee manufacturer code
    pub manufacturer_code: u16,
    /// OTA image type
    pub image_type: u16,
}

impl OtaTarget {
    /// Create a target
    pub const fn new(manufacturer_code: u16, image_type: u16) -> Self {
        Self {
            manufacturer_code,
            image_type,
        }
    }
}

/// A vendor family: the manufacturer codes and URL keywords that identify
/// its images in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorFamily {
    /// Display name, e.g. `"Xiaomi/Aqara"`
    pub name: String,
    /// Manufacturer codes owned by the family
    pub manufacturer_codes: Vec<u16>,
    /// Lowercase substrings that identify the family in image URLs
    #[serde(default)]
    pub url_keywords: Vec<String>,
}

impl VendorFamily {
    /// Create a family
    pub fn new(
        name: impl Into<String>,
        manufacturer_codes: impl Into<Vec<u16>>,
        url_keywords: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            manufacturer_codes: manufacturer_codes.into(),
            url_keywords: url_keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Whether `record` belongs to this family.
    ///
    /// Matches on manufacturer code, or on any keyword appearing in the
    /// record URL (case-insensitive).
    pub fn matches(&self, record: &FirmwareImageRecord) -> bool {
        if self.manufacturer_codes.contains(&record.manufacturer_code) {
            return true;
        }
        let url = record.url.to_lowercase();
        self.url_keywords
            .iter()
            .any(|keyword| url.contains(&keyword.to_lowercase()))
    }
}

/// Lookup table for one vendor family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorTable {
    /// Family the table resolves devices into
    pub family: VendorFamily,
    /// Exact manufacturer name -> target
    #[serde(default)]
    pub by_manufacturer_name: BTreeMap<String, OtaTarget>,
    /// Exact model id -> target
    #[serde(default)]
    pub by_model_id: BTreeMap<String, OtaTarget>,
}

impl VendorTable {
    /// Create an empty table for `family`
    pub fn new(family: VendorFamily) -> Self {
        Self {
            family,
            by_manufacturer_name: BTreeMap::new(),
            by_model_id: BTreeMap::new(),
        }
    }

    /// Add a manufacturer name entry
    pub fn with_manufacturer_name(mut self, name: impl Into<String>, target: OtaTarget) -> Self {
        self.by_manufacturer_name.insert(name.into(), target);
        self
    }

    /// Add a model id entry
    pub fn with_model_id(mut self, model_id: impl Into<String>, target: OtaTarget) -> Self {
        self.by_model_id.insert(model_id.into(), target);
        self
    }

    /// Display name of the family
    pub fn name(&self) -> &str {
        &self.family.name
    }

    /// Resolve a device by manufacturer name first, then by model id.
    pub fn resolve(
        &self,
        manufacturer_name: Option<&str>,
        model_id: Option<&str>,
    ) -> Option<OtaTarget> {
        manufacturer_name
            .and_then(|name| self.by_manufacturer_name.get(name))
            .or_else(|| model_id.and_then(|id| self.by_model_id.get(id)))
            .copied()
    }

    /// Tuya defaults
    pub fn tuya() -> Self {
        let generic = OtaTarget::new(codes::TUYA, 0);
        let family = VendorFamily::new("Tuya", [codes::TUYA, codes::TUYA_ALT], &["tuya"]);
        [
            "_TZE284_vvmbj46n",
            "_TZ3000_kdi2o9m6",
            "_TZ3000_gjnozsaz",
            "_TZ3000_h1ipgkwn",
            "_TZE200_ar0slwnd",
        ]
        .into_iter()
        .fold(Self::new(family), |table, name| {
            table.with_manufacturer_name(name, generic)
        })
        .with_model_id("TS0601", generic)
    }

    /// Xiaomi/Aqara defaults
    pub fn xiaomi() -> Self {
        let family = VendorFamily::new(
            "Xiaomi/Aqara",
            [codes::XIAOMI, codes::AQARA, codes::LUMI],
            &["xiaomi", "aqara", "lumi"],
        );
        Self::new(family)
            .with_model_id("lumi.sensor_ht.agl02", OtaTarget::new(codes::XIAOMI, 0x10E1))
            .with_model_id("lumi.sensor_magnet.aq2", OtaTarget::new(codes::XIAOMI, 0x00C3))
            .with_model_id("lumi.sensor_motion.aq2", OtaTarget::new(codes::XIAOMI, 0x00C4))
            .with_model_id("lumi.plug.maeu01", OtaTarget::new(codes::XIAOMI, 0x00C6))
    }
}

/// Ordered set of vendor tables consulted by the advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorTables {
    tables: Vec<VendorTable>,
}

impl Default for VendorTables {
    fn default() -> Self {
        Self::new(vec![VendorTable::tuya(), VendorTable::xiaomi()])
    }
}

impl VendorTables {
    /// Create from tables, consulted in the given order
    pub fn new(tables: Vec<VendorTable>) -> Self {
        Self { tables }
    }

    /// Parse a JSON array of tables.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Config`] if the JSON does not describe a table list.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OtaError::config(format!("invalid vendor tables: {e}")))
    }

    /// Tables in lookup order
    pub fn iter(&self) -> impl Iterator<Item = &VendorTable> {
        self.tables.iter()
    }

    /// Families in lookup order
    pub fn families(&self) -> impl Iterator<Item = &VendorFamily> {
        self.tables.iter().map(|table| &table.family)
    }

    /// Every table that resolves the device, with its target, in order.
    pub fn resolve<'a>(
        &'a self,
        manufacturer_name: Option<&'a str>,
        model_id: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a VendorTable, OtaTarget)> + 'a {
        self.tables.iter().filter_map(move |table| {
            table
                .resolve(manufacturer_name, model_id)
                .map(|target| (table, target))
        })
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether there are no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
