//! Property-based tests for the OTA header codec

use proptest::prelude::*;
use zigbee_ota_header::{
    FormatError, HEADER_STRING_LEN, OTA_HEADER_MIN_LEN, OTA_UPGRADE_FILE_ID, OtaHeader, parse,
};

fn arb_header_string() -> impl Strategy<Value = String> {
    // Printable ASCII only; NUL is the padding byte and is trimmed on decode.
    prop::collection::vec(0x20u8..0x7F, 0..=HEADER_STRING_LEN)
        .prop_map(|bytes| bytes.into_iter().map(char::from).collect())
}

fn arb_fixed_header() -> impl Strategy<Value = OtaHeader> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u32>(),
        any::<u16>(),
        arb_header_string(),
        any::<u32>(),
    )
        .prop_map(
            |(
                header_version,
                header_length,
                manufacturer_code,
                image_type,
                file_version,
                stack_version,
                header_string,
                total_image_size,
            )| OtaHeader {
                upgrade_file_id: OTA_UPGRADE_FILE_ID,
                header_version,
                header_length,
                field_control: 0,
                manufacturer_code,
                image_type,
                file_version,
                stack_version,
                header_string,
                total_image_size,
                security_credential_version: None,
                upgrade_file_destination: None,
                minimum_hardware_version: None,
                maximum_hardware_version: None,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_fixed_header_roundtrip(header in arb_fixed_header()) {
        let bytes = header.encode();
        prop_assert_eq!(bytes.len(), OTA_HEADER_MIN_LEN);

        let decoded = parse(&bytes);
        prop_assert_eq!(decoded, Ok(header));
    }

    #[test]
    fn prop_optional_fields_roundtrip(
        base in arb_fixed_header(),
        credential in any::<u8>(),
        destination in any::<[u8; 8]>(),
        hw_min in any::<u16>(),
        hw_max in any::<u16>(),
    ) {
        let header = OtaHeader { header_length: 0, ..base }
            .with_security_credential_version(credential)
            .with_upgrade_file_destination(destination)
            .with_hardware_versions(hw_min, hw_max);

        let bytes = header.encode();
        prop_assert_eq!(bytes.len(), usize::from(header.header_length));
        prop_assert_eq!(parse(&bytes), Ok(header));
    }

    #[test]
    fn prop_short_buffers_rejected(
        bytes in prop::collection::vec(any::<u8>(), 0..OTA_HEADER_MIN_LEN),
    ) {
        let len = bytes.len();
        prop_assert_eq!(
            parse(&bytes),
            Err(FormatError::TooShort { len, min: OTA_HEADER_MIN_LEN })
        );
    }

    #[test]
    fn prop_wrong_magic_rejected(
        header in arb_fixed_header(),
        magic in any::<u32>()
            .prop_filter("must differ from the OTA file id", |m| *m != OTA_UPGRADE_FILE_ID),
    ) {
        let bytes = OtaHeader { upgrade_file_id: magic, ..header }.encode();
        prop_assert_eq!(parse(&bytes), Err(FormatError::BadMagic { found: magic }));
    }

    #[test]
    fn prop_parse_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(header) = parse(&bytes) {
            prop_assert!(bytes.len() >= OTA_HEADER_MIN_LEN);
            prop_assert_eq!(header.upgrade_file_id, OTA_UPGRADE_FILE_ID);
        }
    }

    #[test]
    fn prop_reencoded_fixed_fields_match_input(
        tail in prop::collection::vec(any::<u8>(), OTA_HEADER_MIN_LEN - 4..128),
    ) {
        let mut bytes = OTA_UPGRADE_FILE_ID.to_le_bytes().to_vec();
        bytes.extend_from_slice(&tail);
        let header = parse(&bytes)?;
        let reparsed = parse(&header.encode())?;

        prop_assert_eq!(reparsed.header_version, header.header_version);
        prop_assert_eq!(reparsed.header_length, header.header_length);
        prop_assert_eq!(reparsed.field_control, header.field_control);
        prop_assert_eq!(reparsed.manufacturer_code, header.manufacturer_code);
        prop_assert_eq!(reparsed.image_type, header.image_type);
        prop_assert_eq!(reparsed.file_version, header.file_version);
        prop_assert_eq!(reparsed.stack_version, header.stack_version);
        prop_assert_eq!(reparsed.total_image_size, header.total_image_size);
    }

    #[test]
    fn prop_trailing_nul_padding_trimmed(text in arb_header_string(), pad in 0usize..8) {
        let mut padded = text.clone();
        let room = HEADER_STRING_LEN.saturating_sub(text.len());
        padded.extend(std::iter::repeat_n('\0', pad.min(room)));

        let decoded = parse(&OtaHeader::new(1, 2, 3).with_header_string(padded).encode());
        prop_assert_eq!(decoded.map(|h| h.header_string), Ok(text));
    }
}
