//! Error types for container decoding.

use std::io;

use rknn_core::GraphError;
use thiserror::Error;

/// Convenience alias for results within the format crate.
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors that can occur while decoding a container.
///
/// Every variant is terminal: a decode that fails returns no partial model.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid magic bytes: expected RKNN, found {found:02x?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("header truncated: need {expected} bytes, have {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("unsupported container version {version:#x} (sub-revision {sub_revision:#x})")]
    UnsupportedVersion { version: u64, sub_revision: u64 },

    #[error("schema section truncated at offset {offset}: need {expected} bytes, have {available}")]
    TruncatedSchemaSection {
        offset: usize,
        expected: u64,
        available: usize,
    },

    #[error("metadata length prefix truncated at offset {offset}")]
    TruncatedMetadataPrefix { offset: usize },

    #[error("invalid metadata length {length} at offset {offset}: {available} bytes available")]
    InvalidMetadataLength {
        offset: usize,
        length: u64,
        available: usize,
    },

    #[error("metadata at offset {offset} is not valid UTF-8: {reason}")]
    InvalidMetadataEncoding { offset: usize, reason: String },

    #[error("metadata is not valid JSON: {0}")]
    InvalidMetadataJson(#[source] serde_json::Error),

    #[error("schema section is not a valid model buffer: {reason}")]
    InvalidSchema { reason: String },

    #[error("invalid VPMN signature at offset {offset}")]
    InvalidVpmnSignature { offset: usize },

    #[error("VPMN region truncated at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedVpmn {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FormatError {
    /// Decode stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            FormatError::InvalidMagic { .. }
            | FormatError::TruncatedHeader { .. }
            | FormatError::UnsupportedVersion { .. } => "header",
            FormatError::TruncatedSchemaSection { .. }
            | FormatError::TruncatedMetadataPrefix { .. }
            | FormatError::InvalidMetadataLength { .. }
            | FormatError::InvalidMetadataEncoding { .. } => "sections",
            FormatError::InvalidMetadataJson(_) => "metadata",
            FormatError::InvalidSchema { .. } | FormatError::InternalInconsistency(_) => "schema",
            FormatError::InvalidVpmnSignature { .. } | FormatError::TruncatedVpmn { .. } => "vpmn",
            FormatError::Graph(_) => "graph",
            FormatError::Io(_) => "io",
            FormatError::Config(_) => "config",
        }
    }
}
