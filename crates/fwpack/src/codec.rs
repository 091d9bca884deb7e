//! FLFW package encoding and decoding.
//!
//! # Layout
//!
//! ```text
//! offset  size    field
//! 0       5       magic "FLFW\0"
//! 5       4       metadata length L, u32 little-endian
//! 9       L       metadata, UTF-8 compact JSON
//! 9+L     rest    payload, verbatim
//! ```

use crate::{FirmwareMetadata, PackageError, PackageResult};
use std::fmt;
use std::ops::Range;

/// Package magic marker.
pub const MAGIC: [u8; 5] = *b"FLFW\0";

/// Size of the metadata length field.
pub const LENGTH_FIELD_LEN: usize = 4;

/// Size of the fixed header (magic + length).
pub const HEADER_LEN: usize = MAGIC.len() + LENGTH_FIELD_LEN;

/// Largest metadata block the on-device updater accepts.
pub const DEVICE_METADATA_LIMIT: usize = 2048;

/// Encode metadata and payload into a package.
///
/// # Errors
///
/// Returns [`PackageError::MetadataTooLarge`] if the serialized metadata does
/// not fit in the 32-bit length field.
pub fn encode(metadata: &FirmwareMetadata, payload: &[u8]) -> PackageResult<Vec<u8>> {
    let metadata_bytes = metadata.to_compact_json()?;
    frame(&metadata_bytes, payload)
}

/// Decode a package into its metadata and a borrowed view of its payload.
pub fn decode(buffer: &[u8]) -> PackageResult<(FirmwareMetadata, &[u8])> {
    let header = inspect(buffer)?;

    let metadata = serde_json::from_slice(&buffer[header.metadata_range()])
        .map_err(PackageError::InvalidMetadataJson)?;

    Ok((metadata, &buffer[header.payload_range()]))
}

/// Validate the header and framing of a package without parsing its metadata.
pub fn inspect(buffer: &[u8]) -> PackageResult<PackageHeader> {
    if buffer.len() < HEADER_LEN {
        return Err(PackageError::TruncatedHeader {
            expected: HEADER_LEN,
            actual: buffer.len(),
        });
    }

    let mut found = [0u8; MAGIC.len()];
    found.copy_from_slice(&buffer[..MAGIC.len()]);
    if found != MAGIC {
        return Err(PackageError::CorruptHeader {
            expected: MAGIC,
            found,
        });
    }

    let mut length = [0u8; LENGTH_FIELD_LEN];
    length.copy_from_slice(&buffer[MAGIC.len()..HEADER_LEN]);
    let metadata_len = u32::from_le_bytes(length);

    let declared = metadata_len as usize;
    let available = buffer.len() - HEADER_LEN;
    if available < declared {
        return Err(PackageError::TruncatedMetadata {
            declared,
            available,
        });
    }

    Ok(PackageHeader {
        metadata_len,
        payload_len: available - declared,
    })
}

/// Assemble header, metadata, and payload.
fn frame(metadata_bytes: &[u8], payload: &[u8]) -> PackageResult<Vec<u8>> {
    let length = length_field(metadata_bytes.len())?;

    let mut package = Vec::with_capacity(HEADER_LEN + metadata_bytes.len() + payload.len());
    package.extend_from_slice(&MAGIC);
    package.extend_from_slice(&length.to_le_bytes());
    package.extend_from_slice(metadata_bytes);
    package.extend_from_slice(payload);

    Ok(package)
}

fn length_field(len: usize) -> PackageResult<u32> {
    u32::try_from(len).map_err(|_| PackageError::MetadataTooLarge(len))
}

/// Structural facts about a package, read from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageHeader {
    /// Declared metadata length.
    pub metadata_len: u32,
    /// Bytes following the metadata block.
    pub payload_len: usize,
}

impl PackageHeader {
    /// Byte range of the metadata block.
    #[must_use]
    pub fn metadata_range(&self) -> Range<usize> {
        HEADER_LEN..HEADER_LEN + self.metadata_len as usize
    }

    /// Byte range of the payload.
    #[must_use]
    pub fn payload_range(&self) -> Range<usize> {
        let start = self.metadata_range().end;
        start..start + self.payload_len
    }

    /// Total package size.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.payload_range().end
    }

    /// Conditions under which the on-device updater would refuse this package.
    #[must_use]
    pub fn device_warnings(&self) -> Vec<DeviceWarning> {
        let mut warnings = Vec::new();
        let metadata_len = self.metadata_len as usize;

        if metadata_len == 0 {
            warnings.push(DeviceWarning::EmptyMetadata);
        } else if metadata_len > DEVICE_METADATA_LIMIT {
            warnings.push(DeviceWarning::MetadataOverLimit {
                len: metadata_len,
                limit: DEVICE_METADATA_LIMIT,
            });
        }

        if self.payload_len == 0 {
            warnings.push(DeviceWarning::EmptyPayload);
        }

        warnings
    }
}

/// A package property the on-device updater rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWarning {
    EmptyMetadata,
    MetadataOverLimit { len: usize, limit: usize },
    EmptyPayload,
}

impl fmt::Display for DeviceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMetadata => write!(f, "metadata block is empty"),
            Self::MetadataOverLimit { len, limit } => {
                write!(f, "metadata block is {len} bytes, device limit is {limit}")
            }
            Self::EmptyPayload => write!(f, "package has no firmware payload"),
        }
    }
}
