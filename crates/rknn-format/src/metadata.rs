//! The JSON metadata section.

use std::collections::BTreeMap;

use rknn_core::{DataType, TensorId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FormatError, Result};

/// Placeholder for absent name and version fields.
pub const UNKNOWN: &str = "Unknown";

/// One `norm_tensor` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormTensor {
    pub tensor_id: TensorId,
    /// Declared tensor name.
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "shape")]
    pub size: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    /// Fields this decoder does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One record of the `graph` connectivity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub left: String,
    #[serde(default)]
    pub left_tensor_id: Option<i64>,
    pub right: String,
    #[serde(default)]
    pub right_tensor_id: Option<i64>,
}

impl Connection {
    fn io_side(&self) -> Option<IoSide> {
        match self.left.as_str() {
            "input" => Some(IoSide::Input),
            "output" => Some(IoSide::Output),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IoSide {
    Input,
    Output,
}

/// Parsed metadata section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub name: String,
    pub version: String,
    pub target_platform: Vec<String>,
    pub norm_tensors: BTreeMap<TensorId, NormTensor>,
    pub connections: Vec<Connection>,
    /// Model inputs in connectivity order.
    pub inputs: Vec<NormTensor>,
    /// Model outputs in connectivity order.
    pub outputs: Vec<NormTensor>,
    /// The whole metadata object.
    pub raw: Map<String, Value>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: UNKNOWN.into(),
            version: UNKNOWN.into(),
            target_platform: Vec::new(),
            norm_tensors: BTreeMap::new(),
            connections: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            raw: Map::new(),
        }
    }
}

impl ModelMetadata {
    /// Parse the metadata JSON. Anything but a JSON object is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Map<String, Value> =
            serde_json::from_str(text).map_err(FormatError::InvalidMetadataJson)?;

        let name = match raw.get("name") {
            Some(Value::String(s)) => s.clone(),
            _ => UNKNOWN.into(),
        };
        let version = match raw.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => UNKNOWN.into(),
        };
        let target_platform = match raw.get("target_platform") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        };

        let norm_tensors = records::<NormTensor>(raw.get("norm_tensor"), "norm_tensor")
            .into_iter()
            .map(|t| (t.tensor_id, t))
            .collect::<BTreeMap<_, _>>();
        let connections = records::<Connection>(raw.get("graph"), "graph");

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for conn in &connections {
            let Some(side) = conn.io_side() else {
                continue;
            };
            let resolved = conn
                .right_tensor_id
                .and_then(|id| TensorId::try_from(id).ok())
                .and_then(|id| norm_tensors.get(&id));
            let Some(tensor) = resolved else {
                tracing::debug!(
                    "{} record for '{}' names unknown tensor {:?}; skipping",
                    conn.left,
                    conn.right,
                    conn.right_tensor_id
                );
                continue;
            };
            match side {
                IoSide::Input => inputs.push(tensor.clone()),
                IoSide::Output => outputs.push(tensor.clone()),
            }
        }

        tracing::debug!(
            "metadata '{name}': {} tensors, {} inputs, {} outputs",
            norm_tensors.len(),
            inputs.len(),
            outputs.len()
        );
        Ok(Self {
            name,
            version,
            target_platform,
            norm_tensors,
            connections,
            inputs,
            outputs,
            raw,
        })
    }
}

fn records<T: for<'de> Deserialize<'de>>(list: Option<&Value>, key: &str) -> Vec<T> {
    let Some(Value::Array(items)) = list else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("skipping malformed {key}[{i}]: {e}");
                None
            }
        })
        .collect()
}
