//! Whole-container decoding.

use std::path::Path;

use rknn_core::{Graph, RenderGraph, ViewOptions};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::config::DecoderConfig;
use crate::error::Result;
use crate::generator::{parse_generator, GeneratorInfo};
use crate::header::{detect_dialect, ContainerHeader, Dialect, LayoutSource};
use crate::merge::{merge_io, IoTensor, MergedIo};
use crate::metadata::ModelMetadata;
use crate::schema::{decode_schema, SchemaInfo, SchemaOutcome};
use crate::section::{extract_sections, Sections};
use crate::vpmn::{locate_vpmn, read_vpmn, read_vpmn_at, VpmnModel};

/// Where the compute graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphSource {
    Schema,
    Vpmn,
    Unavailable,
}

/// A decoded RKNN model.
#[derive(Debug, Clone)]
pub struct RknnModel {
    pub dialect: Dialect,
    pub file_size: usize,
    /// Lowercase hex SHA-256 of the container bytes.
    pub sha256: String,
    pub metadata: ModelMetadata,
    pub schema: Option<SchemaInfo>,
    pub generator: Option<GeneratorInfo>,
    pub io: MergedIo,
    pub vpmn: Option<VpmnModel>,
    pub graph: Option<Graph>,
    pub graph_source: GraphSource,
}

impl RknnModel {
    /// Read and decode a model file with the default configuration.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &DecoderConfig::default())
    }

    /// Read and decode a model file.
    pub fn open_with(path: &Path, config: &DecoderConfig) -> Result<Self> {
        let data = std::fs::read(path)?;
        tracing::info!("decoding {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(&data, config)
    }

    /// Decode an in-memory container.
    pub fn from_bytes(data: &[u8], config: &DecoderConfig) -> Result<Self> {
        let dialect = detect_dialect(data, config)?;
        let sha256 = format!("{:x}", Sha256::digest(data));

        let decoded = match &dialect {
            Dialect::Modern(header) | Dialect::Legacy3Field(header) => {
                decode_wrapped(data, header, config)?
            }
            Dialect::Vpmn => {
                let vpmn = read_vpmn(data)?;
                Decoded {
                    metadata: ModelMetadata {
                        name: vpmn.name.clone(),
                        ..ModelMetadata::default()
                    },
                    schema: None,
                    generator: None,
                    graph: Some(vpmn.clone().into_graph()?),
                    graph_source: GraphSource::Vpmn,
                    vpmn: Some(vpmn),
                }
            }
        };

        let io = merge_io(
            &decoded.metadata.inputs,
            &decoded.metadata.outputs,
            decoded.generator.as_ref(),
        );
        tracing::info!(
            "decoded '{}' ({} dialect): {} inputs, {} outputs, graph from {:?}",
            decoded.metadata.name,
            dialect.name(),
            io.inputs.len(),
            io.outputs.len(),
            decoded.graph_source
        );

        Ok(Self {
            dialect,
            file_size: data.len(),
            sha256,
            metadata: decoded.metadata,
            schema: decoded.schema,
            generator: decoded.generator,
            io,
            vpmn: decoded.vpmn,
            graph: decoded.graph,
            graph_source: decoded.graph_source,
        })
    }

    pub fn header(&self) -> Option<&ContainerHeader> {
        match &self.dialect {
            Dialect::Modern(header) | Dialect::Legacy3Field(header) => Some(header),
            Dialect::Vpmn => None,
        }
    }

    pub fn inputs(&self) -> &[IoTensor] {
        &self.io.inputs
    }

    pub fn outputs(&self) -> &[IoTensor] {
        &self.io.outputs
    }

    /// Render-facing projection of the compute graph, if one was recovered.
    pub fn render(&self, options: ViewOptions) -> Option<RenderGraph> {
        self.graph
            .as_ref()
            .map(|graph| RenderGraph::build(graph, options))
    }

    pub fn report(&self) -> ModelReport {
        let header = self.header();
        ModelReport {
            file_size: self.file_size,
            sha256: self.sha256.clone(),
            dialect: self.dialect.name(),
            version: header.map(|h| h.version.to_string()),
            header_size: header.map(|h| h.size),
            header_layout: header.map(|h| h.layout),
            name: self.metadata.name.clone(),
            model_version: self.metadata.version.clone(),
            target_platform: self.metadata.target_platform.clone(),
            inputs: self.io.inputs.clone(),
            outputs: self.io.outputs.clone(),
            schema: self.schema.clone(),
            generator: self.generator.as_ref().map(|g| g.raw.clone()),
            metadata: self.metadata.raw.clone(),
            graph_source: self.graph_source,
            node_count: self.graph.as_ref().map_or(0, Graph::node_count),
        }
    }
}

/// Serializable summary for reporting collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub file_size: usize,
    pub sha256: String,
    pub dialect: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_layout: Option<LayoutSource>,
    pub name: String,
    pub model_version: String,
    pub target_platform: Vec<String>,
    pub inputs: Vec<IoTensor>,
    pub outputs: Vec<IoTensor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<Map<String, Value>>,
    pub metadata: Map<String, Value>,
    pub graph_source: GraphSource,
    pub node_count: usize,
}

struct Decoded {
    metadata: ModelMetadata,
    schema: Option<SchemaInfo>,
    generator: Option<GeneratorInfo>,
    vpmn: Option<VpmnModel>,
    graph: Option<Graph>,
    graph_source: GraphSource,
}

fn decode_wrapped(data: &[u8], header: &ContainerHeader, config: &DecoderConfig) -> Result<Decoded> {
    let sections = extract_sections(data, header)?;
    let metadata = ModelMetadata::parse(sections.metadata)?;

    let mut schema = None;
    let mut generator = None;
    let mut graph = None;
    match sections.schema {
        Some(bytes) if config.parse_schema => {
            if let SchemaOutcome::Decoded(model) = decode_schema(bytes, header.revision)? {
                generator = model.generator.as_deref().and_then(parse_generator);
                schema = Some(model.info);
                graph = model
                    .graphs
                    .into_iter()
                    .next()
                    .map(|g| g.into_graph())
                    .transpose()?;
            }
        }
        Some(bytes) => tracing::debug!("schema decoding disabled; skipping {} bytes", bytes.len()),
        None => {}
    }

    if let Some(graph) = graph {
        return Ok(Decoded {
            metadata,
            schema,
            generator,
            vpmn: None,
            graph: Some(graph),
            graph_source: GraphSource::Schema,
        });
    }

    let vpmn = if config.locate_vpmn {
        embedded_vpmn(data, &sections)
    } else {
        None
    };
    let graph = vpmn.as_ref().and_then(|model| match model.clone().into_graph() {
        Ok(graph) => Some(graph),
        Err(e) => {
            tracing::warn!("embedded VPMN graph rejected: {e}");
            None
        }
    });
    let graph_source = if graph.is_some() {
        GraphSource::Vpmn
    } else {
        tracing::warn!("no compute graph recovered from {:?} container", header.revision);
        GraphSource::Unavailable
    };
    Ok(Decoded {
        metadata,
        schema,
        generator,
        vpmn,
        graph,
        graph_source,
    })
}

/// Find and decode a VPMN region in the schema section or the trailing bytes.
///
/// Best effort: a signature that does not start a readable region is skipped
/// and the search resumes one byte later.
fn embedded_vpmn(data: &[u8], sections: &Sections<'_>) -> Option<VpmnModel> {
    let trailing_offset = data.len() - sections.trailing.len();
    let regions = [
        (sections.schema.unwrap_or_default(), sections.schema_offset),
        (sections.trailing, trailing_offset),
    ];
    for (region, region_offset) in regions {
        let mut start = 0;
        while let Some(found) = locate_vpmn(&region[start..]) {
            let pos = start + found;
            let base = region_offset + pos;
            match read_vpmn_at(&region[pos..], base) {
                Ok(model) => {
                    tracing::debug!("VPMN region at offset {base}");
                    return Some(model);
                }
                Err(e) => tracing::warn!("ignoring VPMN signature at offset {base}: {e}"),
            }
            start = pos + 1;
        }
    }
    None
}
