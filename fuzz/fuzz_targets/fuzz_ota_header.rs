//! Fuzzes the OTA upgrade file header parser.
//!
//! Run with:
//!   cargo fuzz run fuzz_ota_header

#![no_main]

use libfuzzer_sys::fuzz_target;
use zigbee_ota_header::{FieldControl, OTA_HEADER_MIN_LEN, OtaHeader, parse};

/// Every flagged optional field was present in the input.
fn optional_fields_complete(header: &OtaHeader) -> bool {
    let fc = header.flags();
    (!fc.contains(FieldControl::SECURITY_CREDENTIAL_VERSION)
        || header.security_credential_version.is_some())
        && (!fc.contains(FieldControl::DEVICE_SPECIFIC_FILE)
            || header.upgrade_file_destination.is_some())
        && (!fc.contains(FieldControl::HARDWARE_VERSIONS)
            || (header.minimum_hardware_version.is_some()
                && header.maximum_hardware_version.is_some()))
}

fuzz_target!(|data: &[u8]| {
    // Errors are fine; a parsed header must survive re-encoding.
    let Ok(header) = parse(data) else {
        return;
    };
    let encoded = header.encode();
    let Ok(reparsed) = parse(&encoded) else {
        panic!("re-encoded header failed to parse");
    };

    let fixed = |h: &OtaHeader| {
        (
            h.upgrade_file_id,
            h.header_version,
            h.header_length,
            h.field_control,
            h.manufacturer_code,
            h.image_type,
            h.file_version,
            h.stack_version,
            h.total_image_size,
        )
    };
    assert_eq!(fixed(&reparsed), fixed(&header));

    // Non-ASCII strings are decoded lossily and may not round-trip.
    if header.header_string.is_ascii() {
        assert_eq!(
            encoded.get(..OTA_HEADER_MIN_LEN),
            data.get(..OTA_HEADER_MIN_LEN)
        );
        if optional_fields_complete(&header) {
            assert_eq!(reparsed, header);
        }
    }
});
