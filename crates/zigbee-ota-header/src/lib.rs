//! Zigbee OTA upgrade file header codec.
//!
//! Every OTA image distributed through the zigbee-OTA index starts with the
//! header defined by the Zigbee Cluster Library OTA Upgrade cluster. This
//! crate decodes that header from a byte buffer and encodes it back. It is
//! I/O-free so the update crate and the fuzz targets can share it.
//!
//! # Layout
//!
//! All fields are little-endian. The fixed prefix is 56 bytes:
//!
//! | Offset | Size | Field               |
//! |--------|------|---------------------|
//! | 0      | 4    | upgrade file id     |
//! | 4      | 2    | header version      |
//! | 6      | 2    | header length       |
//! | 8      | 2    | field control       |
//! | 10     | 2    | manufacturer code   |
//! | 12     | 2    | image type          |
//! | 14     | 4    | file version        |
//! | 18     | 2    | zigbee stack version|
//! | 20     | 32   | header string       |
//! | 52     | 4    | total image size    |
//!
//! Optional fields follow in order when their [`FieldControl`] bit is set:
//! security credential version (1), upgrade file destination (8), minimum
//! and maximum hardware version (2 + 2).
//!
//! # Example
//!
//! ```
//! use zigbee_ota_header::{OtaHeader, parse};
//!
//! let header = OtaHeader::new(0x1141, 0x000A, 5).with_header_string("TS0601 v5");
//! let bytes = header.encode();
//! let decoded = parse(&bytes)?;
//! assert_eq!(decoded, header);
//! # Ok::<(), zigbee_ota_header::FormatError>(())
//! ```

#![deny(static_mut_refs)]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;

pub use error::FormatError;

/// Upgrade file identifier every OTA image must start with.
pub const OTA_UPGRADE_FILE_ID: u32 = 0x0BEE_F11E;

/// Header version defined by the current ZCL revision.
pub const OTA_HEADER_VERSION: u16 = 0x0100;

/// ZigBee PRO stack version.
pub const ZIGBEE_PRO_STACK_VERSION: u16 = 0x0002;

/// Byte length of the fixed header prefix.
pub const OTA_HEADER_MIN_LEN: usize = 56;

/// Byte length of the header string field.
pub const HEADER_STRING_LEN: usize = 32;

/// Byte offsets of the fixed header fields.
pub mod layout {
    /// Upgrade file identifier (`u32`)
    pub const UPGRADE_FILE_ID: usize = 0;
    /// Header version (`u16`)
    pub const HEADER_VERSION: usize = 4;
    /// Declared header length (`u16`)
    pub const HEADER_LENGTH: usize = 6;
    /// Field control word (`u16`)
    pub const FIELD_CONTROL: usize = 8;
    /// Manufacturer code (`u16`)
    pub const MANUFACTURER_CODE: usize = 10;
    /// Image type (`u16`)
    pub const IMAGE_TYPE: usize = 12;
    /// File version (`u32`)
    pub const FILE_VERSION: usize = 14;
    /// ZigBee stack version (`u16`)
    pub const STACK_VERSION: usize = 18;
    /// Header string (32 bytes, NUL padded)
    pub const HEADER_STRING: usize = 20;
    /// Total image size including the header (`u32`)
    pub const TOTAL_IMAGE_SIZE: usize = 52;
    /// First optional field, when any is flagged
    pub const OPTIONAL_FIELDS: usize = 56;
}

bitflags::bitflags! {
    /// Header field control bits selecting the optional trailing fields.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldControl: u16 {
        /// Security credential version byte is present
        const SECURITY_CREDENTIAL_VERSION = 0b0000_0001;
        /// Upgrade file destination (IEEE address) is present
        const DEVICE_SPECIFIC_FILE        = 0b0000_0010;
        /// Minimum and maximum hardware versions are present
        const HARDWARE_VERSIONS           = 0b0000_0100;
    }
}

/// Decoded OTA upgrade file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtaHeader {
    /// Magic number, always [`OTA_UPGRADE_FILE_ID`] after a successful parse
    pub upgrade_file_id: u32,
    /// Header format version
    pub header_version: u16,
    /// Total header length in bytes, optional fields included
    pub header_length: u16,
    /// Raw field control word
    pub field_control: u16,
    /// Zigbee manufacturer code the image targets
    pub manufacturer_code: u16,
    /// Manufacturer-specific image type
    pub image_type: u16,
    /// Firmware file version
    pub file_version: u32,
    /// Zigbee stack version
    pub stack_version: u16,
    /// Human-readable header string with trailing NUL bytes removed
    pub header_string: String,
    /// Total image size in bytes, header included
    pub total_image_size: u32,
    /// Security credential version, if flagged and present
    pub security_credential_version: Option<u8>,
    /// IEEE address of the device this file is restricted to, if flagged and present
    pub upgrade_file_destination: Option<[u8; 8]>,
    /// Minimum hardware version, if flagged and present
    pub minimum_hardware_version: Option<u16>,
    /// Maximum hardware version, if flagged and present
    pub maximum_hardware_version: Option<u16>,
}

impl OtaHeader {
    /// Create a header with no optional fields for the given image identity.
    pub fn new(manufacturer_code: u16, image_type: u16, file_version: u32) -> Self {
        Self {
            upgrade_file_id: OTA_UPGRADE_FILE_ID,
            header_version: OTA_HEADER_VERSION,
            header_length: OTA_HEADER_MIN_LEN as u16,
            field_control: 0,
            manufacturer_code,
            image_type,
            file_version,
            stack_version: ZIGBEE_PRO_STACK_VERSION,
            header_string: String::new(),
            total_image_size: OTA_HEADER_MIN_LEN as u32,
            security_credential_version: None,
            upgrade_file_destination: None,
            minimum_hardware_version: None,
            maximum_hardware_version: None,
        }
    }

    /// Set the header string. Anything past 32 bytes is dropped on encode.
    pub fn with_header_string(mut self, header_string: impl Into<String>) -> Self {
        self.header_string = header_string.into();
        self
    }

    /// Set the total image size.
    pub fn with_total_image_size(mut self, total_image_size: u32) -> Self {
        self.total_image_size = total_image_size;
        self
    }

    /// Restrict the image to a hardware version range.
    pub fn with_hardware_versions(mut self, min: u16, max: u16) -> Self {
        self.minimum_hardware_version = Some(min);
        self.maximum_hardware_version = Some(max);
        self.sync_optional_fields();
        self
    }

    /// Set the security credential version.
    pub fn with_security_credential_version(mut self, version: u8) -> Self {
        self.security_credential_version = Some(version);
        self.sync_optional_fields();
        self
    }

    /// Restrict the image to a single device by IEEE address.
    pub fn with_upgrade_file_destination(mut self, ieee_address: [u8; 8]) -> Self {
        self.upgrade_file_destination = Some(ieee_address);
        self.sync_optional_fields();
        self
    }

    /// Typed view of the field control word. Unknown bits are dropped.
    pub fn flags(&self) -> FieldControl {
        FieldControl::from_bits_truncate(self.field_control)
    }

    /// Number of bytes [`OtaHeader::encode`] produces.
    pub fn encoded_len(&self) -> usize {
        let fc = self.flags();
        let mut len = OTA_HEADER_MIN_LEN;
        if fc.contains(FieldControl::SECURITY_CREDENTIAL_VERSION) {
            len += 1;
        }
        if fc.contains(FieldControl::DEVICE_SPECIFIC_FILE) {
            len += 8;
        }
        if fc.contains(FieldControl::HARDWARE_VERSIONS) {
            len += 4;
        }
        len
    }

    /// Encode the header into its wire representation.
    ///
    /// Optional fields are written for every bit set in `field_control`;
    /// a flagged field without a value is written as zeros.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.upgrade_file_id.to_le_bytes());
        out.extend_from_slice(&self.header_version.to_le_bytes());
        out.extend_from_slice(&self.header_length.to_le_bytes());
        out.extend_from_slice(&self.field_control.to_le_bytes());
        out.extend_from_slice(&self.manufacturer_code.to_le_bytes());
        out.extend_from_slice(&self.image_type.to_le_bytes());
        out.extend_from_slice(&self.file_version.to_le_bytes());
        out.extend_from_slice(&self.stack_version.to_le_bytes());

        let mut header_string = [0u8; HEADER_STRING_LEN];
        for (slot, byte) in header_string.iter_mut().zip(self.header_string.bytes()) {
            *slot = byte;
        }
        out.extend_from_slice(&header_string);
        out.extend_from_slice(&self.total_image_size.to_le_bytes());

        let fc = self.flags();
        if fc.contains(FieldControl::SECURITY_CREDENTIAL_VERSION) {
            out.push(self.security_credential_version.unwrap_or(0));
        }
        if fc.contains(FieldControl::DEVICE_SPECIFIC_FILE) {
            out.extend_from_slice(&self.upgrade_file_destination.unwrap_or([0; 8]));
        }
        if fc.contains(FieldControl::HARDWARE_VERSIONS) {
            out.extend_from_slice(&self.minimum_hardware_version.unwrap_or(0).to_le_bytes());
            out.extend_from_slice(&self.maximum_hardware_version.unwrap_or(0).to_le_bytes());
        }
        out
    }

    fn sync_optional_fields(&mut self) {
        let mut fc = self.flags();
        fc.set(
            FieldControl::SECURITY_CREDENTIAL_VERSION,
            self.security_credential_version.is_some(),
        );
        fc.set(
            FieldControl::DEVICE_SPECIFIC_FILE,
            self.upgrade_file_destination.is_some(),
        );
        fc.set(
            FieldControl::HARDWARE_VERSIONS,
            self.minimum_hardware_version.is_some() || self.maximum_hardware_version.is_some(),
        );
        self.field_control = fc.bits();
        self.header_length = u16::try_from(self.encoded_len()).unwrap_or(u16::MAX);
    }
}

/// Read a little-endian `u16` from `bytes` at `offset`.
pub fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes(raw.try_into().ok()?))
}

/// Read a little-endian `u32` from `bytes` at `offset`.
pub fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn decode_header_string(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(raw.get(..end).unwrap_or_default()).into_owned()
}

/// Decode an OTA header from the start of `bytes`.
///
/// Bytes past the header (the image payload) are ignored. Optional fields
/// are decoded only when flagged and fully contained in both the buffer and
/// the declared header length; otherwise they are left as `None`.
///
/// # Errors
///
/// Returns [`FormatError::TooShort`] for buffers under 56 bytes and
/// [`FormatError::BadMagic`] when the upgrade file id is wrong.
pub fn parse(bytes: &[u8]) -> Result<OtaHeader, FormatError> {
    let too_short = FormatError::TooShort {
        len: bytes.len(),
        min: OTA_HEADER_MIN_LEN,
    };
    if bytes.len() < OTA_HEADER_MIN_LEN {
        return Err(too_short);
    }

    let u16_at = |offset| read_u16_le(bytes, offset).ok_or(too_short);
    let u32_at = |offset| read_u32_le(bytes, offset).ok_or(too_short);

    let upgrade_file_id = u32_at(layout::UPGRADE_FILE_ID)?;
    if upgrade_file_id != OTA_UPGRADE_FILE_ID {
        return Err(FormatError::BadMagic {
            found: upgrade_file_id,
        });
    }

    let header_length = u16_at(layout::HEADER_LENGTH)?;
    let field_control = u16_at(layout::FIELD_CONTROL)?;
    let header_string = bytes
        .get(layout::HEADER_STRING..layout::HEADER_STRING + HEADER_STRING_LEN)
        .map(decode_header_string)
        .ok_or(too_short)?;

    let mut header = OtaHeader {
        upgrade_file_id,
        header_version: u16_at(layout::HEADER_VERSION)?,
        header_length,
        field_control,
        manufacturer_code: u16_at(layout::MANUFACTURER_CODE)?,
        image_type: u16_at(layout::IMAGE_TYPE)?,
        file_version: u32_at(layout::FILE_VERSION)?,
        stack_version: u16_at(layout::STACK_VERSION)?,
        header_string,
        total_image_size: u32_at(layout::TOTAL_IMAGE_SIZE)?,
        security_credential_version: None,
        upgrade_file_destination: None,
        minimum_hardware_version: None,
        maximum_hardware_version: None,
    };

    let limit = bytes.len().min(usize::from(header_length));
    let optional = bytes.get(..limit).unwrap_or_default();
    let fc = header.flags();
    let mut cursor = layout::OPTIONAL_FIELDS;

    if fc.contains(FieldControl::SECURITY_CREDENTIAL_VERSION) {
        header.security_credential_version = optional.get(cursor).copied();
        cursor += 1;
    }
    if fc.contains(FieldControl::DEVICE_SPECIFIC_FILE) {
        header.upgrade_file_destination = optional
            .get(cursor..cursor + 8)
            .and_then(|raw| <[u8; 8]>::try_from(raw).ok());
        cursor += 8;
    }
    if fc.contains(FieldControl::HARDWARE_VERSIONS) {
        header.minimum_hardware_version = read_u16_le(optional, cursor);
        header.maximum_hardware_version = read_u16_le(optional, cursor + 2);
    }

    Ok(header)
}
