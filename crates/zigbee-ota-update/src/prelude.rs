//! Convenience re-exports for common OTA update types

pub use crate::advisor::{
    DeviceSettings, DeviceSnapshot, OtaDevice, UnavailableReason, UpdateAdvisor,
    UpdateAvailability, UpdateOffer,
};
pub use crate::config::OtaSourceConfig;
pub use crate::error::{IntegrityError, NetworkError, OtaError, ParseError};
pub use crate::fetcher::{ImageFetcher, VerifiedImage};
pub use crate::index::{CacheEntry, IndexCache, IndexSnapshot};
pub use crate::integrity::{sha512_hex, verify};
pub use crate::record::{DeviceIdentity, FirmwareImageRecord};
pub use crate::selector::{
    is_upgrade_eligible, records_for_family, select_downgrade, select_upgrade,
};
pub use crate::stats::{FamilyCount, IndexStats};
pub use crate::transport::{HttpTransport, ReqwestTransport};
pub use crate::vendor::{OtaTarget, VendorFamily, VendorTable, VendorTables};
pub use zigbee_ota_header::{FieldControl, FormatError, OtaHeader};
