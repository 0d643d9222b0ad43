//! Decoder for RKNN model containers.
//!
//! Recovers model metadata, IO tensor descriptions, and (when the encoding
//! allows it) the compute graph from a serialized container.
//!
//! ## File Layout
//!
//! ```text
//! RKNN container:
//! ┌────────────────────────────────────┐
//! │ Magic: "RKNN"                      │  4 bytes
//! │ Padding                            │  4 bytes
//! │ Version (u64 LE)                   │  8 bytes
//! │ Schema length (u64 LE)             │  8 bytes
//! │ Reserved (modern dialects only)    │  up to 64 or 72 bytes total
//! ├────────────────────────────────────┤
//! │ Schema section (FlatBuffers)       │  schema length bytes
//! ├────────────────────────────────────┤
//! │ Metadata length L (u64 LE)         │  8 bytes
//! │ Metadata (UTF-8 JSON)              │  L bytes
//! ├────────────────────────────────────┤
//! │ Trailing bytes (may embed VPMN)    │
//! └────────────────────────────────────┘
//! ```
//!
//! Files starting with `VPMN` are bare legacy graph blobs; see [`vpmn`].

pub mod config;
pub mod container;
pub mod error;
pub mod generator;
pub mod header;
pub mod merge;
pub mod metadata;
pub mod schema;
pub mod section;
pub mod vpmn;

pub use config::{DecoderConfig, HeaderLayoutOverride};
pub use container::{GraphSource, ModelReport, RknnModel};
pub use error::{FormatError, Result};
pub use generator::{parse_generator, GeneratorInfo};
pub use header::{decode_header, detect_dialect, ContainerHeader, Dialect, Revision, Version};
pub use merge::{merge_io, IoTensor};
pub use metadata::ModelMetadata;
pub use schema::{decode_schema, SchemaOutcome};
pub use vpmn::{read_vpmn, VpmnModel};
