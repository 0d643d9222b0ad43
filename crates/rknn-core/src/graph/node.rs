//! Operator nodes.
//!
//! A node is one operator instance in a decoded model graph. It refers to
//! tensors by id only; the owning [`Graph`](super::Graph) resolves those ids.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::tensor::TensorId;

/// Position-derived node identifier, unique within one graph.
pub type NodeId = usize;

/// Op type used by decoders when the container does not name the operator.
pub const UNKNOWN_OP: &str = "Unknown";

/// Op type of the synthetic operator that feeds graph inputs.
pub const INPUT_OPERATOR: &str = "InputOperator";

/// Op type of the synthetic operator that drains graph outputs.
pub const OUTPUT_OPERATOR: &str = "OutputOperator";

/// An operator in the compute graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the graph.
    pub id: NodeId,
    /// Declared name. Often empty in compiled models.
    pub name: String,
    /// Operator type string, e.g. `Conv2D` or `VSI_NN_OP_RELU`.
    pub op_type: String,
    /// Tensors consumed, in operand order.
    pub inputs: Vec<TensorId>,
    /// Tensors produced, in result order.
    pub outputs: Vec<TensorId>,
}

impl Node {
    /// Create a node with no declared name and no tensor connections.
    pub fn new(id: NodeId, op_type: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            op_type: op_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the declared name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the consumed tensor ids.
    pub fn with_inputs(mut self, inputs: Vec<TensorId>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the produced tensor ids.
    pub fn with_outputs(mut self, outputs: Vec<TensorId>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Display label: `"{name}\n{op_type}"` when both are known, otherwise
    /// whichever one is, otherwise `node_{id}`.
    pub fn label(&self) -> String {
        match (self.name.is_empty(), self.op_type.is_empty()) {
            (false, false) => format!("{}\n{}", self.name, self.op_type),
            (false, true) => self.name.clone(),
            (true, false) => self.op_type.clone(),
            (true, true) => format!("node_{}", self.id),
        }
    }

    /// True for the synthetic input/output operators some toolchains emit.
    pub fn is_io_operator(&self) -> bool {
        self.op_type == INPUT_OPERATOR || self.op_type == OUTPUT_OPERATOR
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}#{}", self.op_type, self.id)
        } else {
            write!(f, "{}({})#{}", self.op_type, self.name, self.id)
        }
    }
}
