//! Schema-section decoding.
//!
//! The decodable revision stores the model as a FlatBuffers `Model` with one
//! or more `Graph` tables. Records are copied out of the buffer field by
//! field, so the decoded model does not borrow the container bytes.

pub mod fbs;

use std::collections::BTreeMap;

use flatbuffers::Vector;
use rknn_core::graph::node::UNKNOWN_OP;
use rknn_core::{DataType, Graph, GraphError, Node, Tensor, TensorId};
use serde::Serialize;

use crate::error::{FormatError, Result};
use crate::header::{Revision, Version};

/// Result of running the schema decoder.
#[derive(Debug, Clone)]
pub enum SchemaOutcome {
    Decoded(SchemaModel),
    /// Recognized revision whose encoding this decoder cannot read.
    Unavailable,
}

/// Node and tensor records of one schema graph.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub nodes: Vec<Node>,
    pub tensors: BTreeMap<TensorId, Tensor>,
    pub inputs: Vec<TensorId>,
    pub outputs: Vec<TensorId>,
}

impl SchemaGraph {
    /// Build the compute graph.
    pub fn into_graph(self) -> std::result::Result<Graph, GraphError> {
        Graph::with_io(self.nodes, self.tensors, self.inputs, self.outputs)
    }
}

/// Descriptive strings carried by the schema root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    pub num_graphs: usize,
}

/// Fully decoded schema section.
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    pub info: SchemaInfo,
    /// Free-text generator payload, parsed later by [`crate::generator`].
    pub generator: Option<String>,
    pub graphs: Vec<SchemaGraph>,
}

/// Decode a schema section for a raw header version.
///
/// The header decoder rejects unknown versions, so one that fails to
/// classify here means the caller skipped it.
pub fn decode_schema_raw(bytes: &[u8], version: u64) -> Result<SchemaOutcome> {
    let revision = Revision::classify(Version(version)).ok_or_else(|| {
        FormatError::InternalInconsistency(format!(
            "schema decoder reached with unclassified version {version:#x}"
        ))
    })?;
    decode_schema(bytes, revision)
}

/// Decode a schema section of the given revision.
pub fn decode_schema(bytes: &[u8], revision: Revision) -> Result<SchemaOutcome> {
    match revision {
        Revision::Schema => decode_model(bytes).map(SchemaOutcome::Decoded),
        Revision::DeviceSpecific => {
            tracing::warn!(
                "schema section ({} bytes) uses the device-specific encoding; graph structure unavailable",
                bytes.len()
            );
            Ok(SchemaOutcome::Unavailable)
        }
        Revision::Legacy => Err(FormatError::InternalInconsistency(
            "schema decoder reached for the legacy dialect, which has no schema section".into(),
        )),
    }
}

fn decode_model(bytes: &[u8]) -> Result<SchemaModel> {
    let model = fbs::root_as_model(bytes).map_err(|e| FormatError::InvalidSchema {
        reason: e.to_string(),
    })?;

    let graphs: Vec<SchemaGraph> = model
        .graphs()
        .map(|gs| gs.iter().map(decode_graph).collect())
        .unwrap_or_default();

    tracing::debug!("schema section: {} graph(s)", graphs.len());
    Ok(SchemaModel {
        info: SchemaInfo {
            format: model.format().map(str::to_owned),
            source: model.source().map(str::to_owned),
            compiler: model.compiler().map(str::to_owned),
            runtime: model.runtime().map(str::to_owned),
            num_graphs: graphs.len(),
        },
        generator: model.generator().map(str::to_owned),
        graphs,
    })
}

fn decode_graph(graph: fbs::Graph<'_>) -> SchemaGraph {
    let mut tensors = BTreeMap::new();
    if let Some(records) = graph.tensors() {
        for (index, record) in records.iter().enumerate() {
            let Ok(id) = TensorId::try_from(index) else {
                tracing::warn!("tensor table exceeds id range at index {index}; truncating");
                break;
            };
            let name = record
                .name()
                .filter(|n| !n.is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("tensor_{index}"));
            // A negative (dynamic) dimension leaves the whole shape unknown.
            let shape = record
                .shape()
                .map(|dims| {
                    dims.iter()
                        .map(u64::try_from)
                        .collect::<std::result::Result<Vec<_>, _>>()
                        .unwrap_or_else(|_| {
                            tracing::warn!(
                                "tensor {index} '{name}' has a negative dimension; shape unknown"
                            );
                            Vec::new()
                        })
                })
                .unwrap_or_default();
            let mut tensor = Tensor::new(id, name, shape);
            tensor.dtype = record.data_type().map(|d| DataType::Named(d.to_owned()));
            tensor.layout = record.layout().map(str::to_owned);
            tensor.constant = record.is_const();
            tensors.insert(id, tensor);
        }
    }

    let nodes = graph
        .nodes()
        .map(|records| {
            records
                .iter()
                .enumerate()
                .map(|(index, record)| {
                    Node::new(index, record.type_().unwrap_or(UNKNOWN_OP))
                        .with_name(record.name().unwrap_or_default())
                        .with_inputs(tensor_ids(record.inputs()))
                        .with_outputs(tensor_ids(record.outputs()))
                })
                .collect()
        })
        .unwrap_or_default();

    SchemaGraph {
        nodes,
        tensors,
        inputs: tensor_ids(graph.inputs()),
        outputs: tensor_ids(graph.outputs()),
    }
}

/// Convert a serialized id list; negative entries mark empty operand slots.
fn tensor_ids(ids: Option<Vector<'_, i32>>) -> Vec<TensorId> {
    let Some(ids) = ids else {
        return Vec::new();
    };
    ids.iter()
        .filter_map(|id| match TensorId::try_from(id) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::debug!("skipping empty operand slot {id}");
                None
            }
        })
        .collect()
}
