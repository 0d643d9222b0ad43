//! Container header decoding and dialect detection.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "RKNN"
//! 4       4     padding (ignored)
//! 8       8     version (u64 LE): low byte = major, rest = sub-revision
//! 16      8     schema-section length (u64 LE)
//! 24      ..    reserved up to the dialect's header size (modern only)
//! ```
//!
//! The legacy three-field dialect (major <= 1) ends at byte 24 and never
//! carries a schema section. Modern headers are 64 or 72 bytes depending on
//! the revision; the size is always derived from the version, never assumed.

use std::fmt;

use serde::Serialize;

use crate::config::DecoderConfig;
use crate::error::{FormatError, Result};
use crate::vpmn::VPMN_MAGIC;

/// Magic bytes identifying a container: "RKNN"
pub const MAGIC: [u8; 4] = *b"RKNN";

/// Header size of the legacy three-field dialect.
pub const LEGACY_HEADER_SIZE: usize = 24;

/// Header size of the decodable schema revision.
pub const MODERN_HEADER_SIZE: usize = 64;

/// Header size of the device-specific revision.
pub const DEVICE_HEADER_SIZE: usize = 72;

const VERSION_OFFSET: usize = 8;
const SCHEMA_LEN_OFFSET: usize = 16;

/// Sub-revision of the FlatBuffers-encoded schema section.
pub const SUB_REVISION_SCHEMA: u64 = 0x00;

/// Sub-revision of the device-specific schema section.
pub const SUB_REVISION_DEVICE: u64 = 0x10;

/// Version values whose header size has been checked against real fixtures.
const VERIFIED_LAYOUTS: &[(u64, usize)] = &[
    (0x0003, MODERN_HEADER_SIZE),
    (0x0006, MODERN_HEADER_SIZE),
    (0x1006, DEVICE_HEADER_SIZE),
];

/// Raw container version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Version(pub u64);

impl Version {
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Dialect major number (low byte).
    pub fn major(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Sub-revision flags (everything above the low byte).
    pub fn sub_revision(self) -> u64 {
        self.0 >> 8
    }

    /// Classify the version, rejecting unknown sub-revisions.
    pub fn revision(self) -> Result<Revision> {
        Revision::classify(self).ok_or(FormatError::UnsupportedVersion {
            version: self.0,
            sub_revision: self.sub_revision(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:#x}", self.major(), self.sub_revision())
    }
}

/// What the schema section of a given version contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Revision {
    /// Three-field header; no schema section.
    Legacy,
    /// FlatBuffers-encoded model graph.
    Schema,
    /// Device-specific encoding this decoder cannot read.
    DeviceSpecific,
}

impl Revision {
    /// `None` for sub-revisions outside the recognized set.
    pub fn classify(version: Version) -> Option<Self> {
        match version.sub_revision() {
            SUB_REVISION_SCHEMA | SUB_REVISION_DEVICE if version.major() <= 1 => {
                Some(Revision::Legacy)
            }
            SUB_REVISION_SCHEMA => Some(Revision::Schema),
            SUB_REVISION_DEVICE => Some(Revision::DeviceSpecific),
            _ => None,
        }
    }

    pub fn permits_schema_section(self) -> bool {
        !matches!(self, Revision::Legacy)
    }

    fn default_header_size(self) -> usize {
        match self {
            Revision::Legacy => LEGACY_HEADER_SIZE,
            Revision::Schema => MODERN_HEADER_SIZE,
            Revision::DeviceSpecific => DEVICE_HEADER_SIZE,
        }
    }
}

/// Where a header size came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutSource {
    /// Fixed by the dialect or checked against a fixture.
    Verified,
    /// Forced by [`DecoderConfig::header_layout`].
    Override,
    /// Revision default for a version no fixture covers.
    Assumed,
}

/// Decoded container header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerHeader {
    pub version: Version,
    pub revision: Revision,
    /// Length field as stored; ignored by the legacy dialect.
    pub schema_len: u64,
    /// Effective header size in bytes.
    pub size: usize,
    pub layout: LayoutSource,
}

impl ContainerHeader {
    /// Schema bytes that follow the header, honoring the dialect.
    pub fn effective_schema_len(&self) -> u64 {
        if self.revision.permits_schema_section() {
            self.schema_len
        } else {
            0
        }
    }
}

/// On-disk dialect, selected once per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialect {
    Modern(ContainerHeader),
    Legacy3Field(ContainerHeader),
    /// Bare VPMN model with no RKNN wrapper.
    Vpmn,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Modern(_) => "modern",
            Dialect::Legacy3Field(_) => "legacy-3-field",
            Dialect::Vpmn => "vpmn",
        }
    }
}

/// Identify the dialect of `data`.
pub fn detect_dialect(data: &[u8], config: &DecoderConfig) -> Result<Dialect> {
    if data.starts_with(&VPMN_MAGIC) {
        return Ok(Dialect::Vpmn);
    }
    let header = decode_header(data, config)?;
    Ok(match header.revision {
        Revision::Legacy => Dialect::Legacy3Field(header),
        Revision::Schema | Revision::DeviceSpecific => Dialect::Modern(header),
    })
}

/// Decode and validate the container header at the start of `data`.
pub fn decode_header(data: &[u8], config: &DecoderConfig) -> Result<ContainerHeader> {
    if data.len() < MAGIC.len() {
        return Err(FormatError::TruncatedHeader {
            expected: LEGACY_HEADER_SIZE,
            actual: data.len(),
        });
    }
    let mut found = [0u8; 4];
    found.copy_from_slice(&data[..4]);
    if found != MAGIC {
        return Err(FormatError::InvalidMagic { found });
    }
    if data.len() < LEGACY_HEADER_SIZE {
        return Err(FormatError::TruncatedHeader {
            expected: LEGACY_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let version = Version(read_u64(data, VERSION_OFFSET));
    let revision = version.revision()?;
    let schema_len = read_u64(data, SCHEMA_LEN_OFFSET);
    let (size, layout) = header_size(version, revision, config);

    if data.len() < size {
        return Err(FormatError::TruncatedHeader {
            expected: size,
            actual: data.len(),
        });
    }

    tracing::debug!(
        "header: version {version} ({revision:?}), {size}-byte header, schema length {schema_len}"
    );
    Ok(ContainerHeader {
        version,
        revision,
        schema_len,
        size,
        layout,
    })
}

/// Effective header size for a classified version.
pub fn header_size(
    version: Version,
    revision: Revision,
    config: &DecoderConfig,
) -> (usize, LayoutSource) {
    if revision == Revision::Legacy {
        return (LEGACY_HEADER_SIZE, LayoutSource::Verified);
    }
    if let Some(size) = config.header_size_override(version.raw()) {
        return (size, LayoutSource::Override);
    }
    if let Some(&(_, size)) = VERIFIED_LAYOUTS.iter().find(|(v, _)| *v == version.raw()) {
        return (size, LayoutSource::Verified);
    }
    let size = revision.default_header_size();
    tracing::warn!(
        "no fixture covers container version {:#x}; assuming a {size}-byte {revision:?} header",
        version.raw()
    );
    (size, LayoutSource::Assumed)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}
