//! Bounds-checked slicing of the schema and metadata sections.

use crate::error::{FormatError, Result};
use crate::header::ContainerHeader;

/// Size of the metadata length prefix.
pub const METADATA_PREFIX_SIZE: usize = 8;

/// The sections of one container, borrowed from the input buffer.
#[derive(Debug, Clone, Copy)]
pub struct Sections<'a> {
    /// Schema-section bytes, when the dialect permits one and it is non-empty.
    pub schema: Option<&'a [u8]>,
    /// Offset of the schema section within the container.
    pub schema_offset: usize,
    /// UTF-8 metadata payload.
    pub metadata: &'a str,
    /// Offset of the metadata payload (after its length prefix).
    pub metadata_offset: usize,
    /// Bytes following the metadata payload.
    pub trailing: &'a [u8],
}

/// Slice `data` into sections according to `header`.
pub fn extract_sections<'a>(data: &'a [u8], header: &ContainerHeader) -> Result<Sections<'a>> {
    let schema_offset = header.size;
    let mut cursor = header.size;

    let schema_len = header.effective_schema_len();
    let schema = if schema_len > 0 {
        let available = data.len().saturating_sub(cursor);
        let end = usize::try_from(schema_len)
            .ok()
            .filter(|&len| len <= available)
            .map(|len| cursor + len)
            .ok_or(FormatError::TruncatedSchemaSection {
                offset: cursor,
                expected: schema_len,
                available,
            })?;
        let bytes = &data[cursor..end];
        cursor = end;
        Some(bytes)
    } else {
        None
    };

    let remaining = data.len().saturating_sub(cursor);
    if remaining < METADATA_PREFIX_SIZE {
        return Err(FormatError::TruncatedMetadataPrefix { offset: cursor });
    }
    let mut prefix = [0u8; METADATA_PREFIX_SIZE];
    prefix.copy_from_slice(&data[cursor..cursor + METADATA_PREFIX_SIZE]);
    let length = u64::from_le_bytes(prefix);

    let available = remaining - METADATA_PREFIX_SIZE;
    let metadata_len = usize::try_from(length)
        .ok()
        .filter(|&len| len > 0 && len <= available)
        .ok_or(FormatError::InvalidMetadataLength {
            offset: cursor,
            length,
            available,
        })?;

    let metadata_offset = cursor + METADATA_PREFIX_SIZE;
    let metadata_end = metadata_offset + metadata_len;
    let metadata = std::str::from_utf8(&data[metadata_offset..metadata_end]).map_err(|e| {
        FormatError::InvalidMetadataEncoding {
            offset: metadata_offset + e.valid_up_to(),
            reason: e.to_string(),
        }
    })?;

    let trailing = &data[metadata_end..];
    if !trailing.is_empty() {
        tracing::debug!("{} trailing bytes after metadata", trailing.len());
    }

    Ok(Sections {
        schema,
        schema_offset,
        metadata,
        metadata_offset,
        trailing,
    })
}
