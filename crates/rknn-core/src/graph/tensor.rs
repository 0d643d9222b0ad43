//! Tensor records and their data-type descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tensor identifier, unique within one model.
pub type TensorId = u32;

/// Element type of a tensor.
///
/// Containers describe it either as a flat type name or as a record carrying
/// the primary type tag and an optional quantization type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataType {
    /// Flat type name, e.g. `"int8"`.
    Named(String),
    /// Structured descriptor.
    Tagged {
        vx_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qnt_type: Option<String>,
    },
}

impl DataType {
    /// The primary element type tag.
    pub fn primary(&self) -> &str {
        match self {
            DataType::Named(name) => name,
            DataType::Tagged { vx_type, .. } => vx_type,
        }
    }

    /// The quantization type tag, if the descriptor carries one.
    pub fn quantization(&self) -> Option<&str> {
        match self {
            DataType::Named(_) => None,
            DataType::Tagged { qnt_type, .. } => qnt_type.as_deref(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantization() {
            Some(q) => write!(f, "{} ({q})", self.primary()),
            None => f.write_str(self.primary()),
        }
    }
}

/// Quantization parameters attached to a tensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantInfo {
    /// Quantization method, e.g. `"layer"` or `"channel"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Quantization scheme, e.g. `"asymmetric_quantized"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qtype: Option<String>,
    /// Per-channel scales (one entry for per-tensor quantization).
    #[serde(default)]
    pub scale: Vec<f64>,
    /// Per-channel zero points.
    #[serde(default)]
    pub zero_point: Vec<i64>,
}

/// A tensor in the compute graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub id: TensorId,
    /// Declared name (the container's tensor URL).
    pub name: String,
    /// Dimensions in declaration order. Empty means scalar.
    pub shape: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    /// Embedded constant (weights, biases, lookup tables).
    #[serde(default)]
    pub constant: bool,
}

impl Tensor {
    /// Create a tensor with no type, layout, or constant marking.
    pub fn new(id: TensorId, name: impl Into<String>, shape: Vec<u64>) -> Self {
        Self {
            id,
            name: name.into(),
            shape,
            dtype: None,
            layout: None,
            constant: false,
        }
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Mark the tensor as an embedded constant.
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Total element count; 1 for scalars.
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }
}

/// Format a shape as `[d0, d1, ...]`.
pub fn format_shape(shape: &[u64]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("[{}]", dims.join(", "))
}
