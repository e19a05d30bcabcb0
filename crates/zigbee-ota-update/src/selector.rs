//! Upgrade and downgrade candidate selection
//!
//! Pure functions over an index snapshot. Nothing here touches the network
//! or any cache.

use tracing::debug;

use crate::record::{DeviceIdentity, FirmwareImageRecord};
use crate::vendor::VendorFamily;

/// Whether `record` may be offered to `identity` as an upgrade.
///
/// Restrictions the record leaves unset, and device context the identity
/// leaves unset, never exclude a record.
pub fn is_upgrade_eligible(record: &FirmwareImageRecord, identity: &DeviceIdentity) -> bool {
    let current = identity.current_file_version;

    if !record.targets(identity.manufacturer_code, identity.image_type) {
        return false;
    }
    if !record.force && record.file_version <= current {
        return false;
    }
    if record.min_file_version.is_some_and(|min| current < min) {
        return false;
    }
    if record.max_file_version.is_some_and(|max| current > max) {
        return false;
    }
    if !model_id_allows(record, identity) {
        return false;
    }

    if let (Some(allowed), Some(name)) = (&record.manufacturer_name, &identity.manufacturer_name)
        && !allowed.is_empty()
    {
        let name = name.to_lowercase();
        if !allowed.iter().any(|m| m.to_lowercase() == name) {
            return false;
        }
    }

    if let Some(hw) = identity.hardware_version {
        if record.hardware_version_min.is_some_and(|min| hw < min) {
            return false;
        }
        if record.hardware_version_max.is_some_and(|max| hw > max) {
            return false;
        }
    }

    true
}

/// Best upgrade for `identity`: the eligible record with the highest
/// `file_version`, the earliest one on ties.
pub fn select_upgrade<'a>(
    identity: &DeviceIdentity,
    index: &'a [FirmwareImageRecord],
) -> Option<&'a FirmwareImageRecord> {
    let selected = first_max_version(
        index
            .iter()
            .filter(|record| is_upgrade_eligible(record, identity)),
    );
    if let Some(record) = selected {
        debug!(
            "Upgrade candidate for 0x{:04X}/0x{:04X}: {} -> {}",
            identity.manufacturer_code,
            identity.image_type,
            identity.current_file_version,
            record.file_version
        );
    }
    selected
}

/// Closest lower version for `identity`.
///
/// Only manufacturer code, image type, model id and the strict version
/// ordering are checked.
pub fn select_downgrade<'a>(
    identity: &DeviceIdentity,
    index: &'a [FirmwareImageRecord],
) -> Option<&'a FirmwareImageRecord> {
    first_max_version(index.iter().filter(|record| {
        record.targets(identity.manufacturer_code, identity.image_type)
            && record.file_version < identity.current_file_version
            && model_id_allows(record, identity)
    }))
}

/// Records belonging to `family`, in index order.
pub fn records_for_family<'a>(
    index: &'a [FirmwareImageRecord],
    family: &VendorFamily,
) -> Vec<&'a FirmwareImageRecord> {
    index.iter().filter(|record| family.matches(record)).collect()
}

fn model_id_allows(record: &FirmwareImageRecord, identity: &DeviceIdentity) -> bool {
    match (&record.model_id, &identity.model_id) {
        (Some(wanted), Some(actual)) => wanted == actual,
        _ => true,
    }
}

// `Iterator::max_by_key` keeps the last maximum; ties must go to the first.
fn first_max_version<'a>(
    records: impl Iterator<Item = &'a FirmwareImageRecord>,
) -> Option<&'a FirmwareImageRecord> {
    records.fold(None, |best, record| match best {
        Some(best) if best.file_version >= record.file_version => Some(best),
        _ => Some(record),
    })
}
