//! Renderer-facing projection of a compute graph.
//!
//! The renderer draws whatever this produces: ordered labelled nodes, each in
//! one category, and directed edges with optional shape labels. Operator nodes
//! also carry an [`OpCategory`] the renderer maps to its own styling.

use std::collections::HashMap;

use serde::Serialize;

use crate::graph::node::{Node, INPUT_OPERATOR, OUTPUT_OPERATOR};
use crate::graph::tensor::TensorId;
use crate::graph::{Graph, TensorRole};

/// What a render node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Input,
    Output,
    Constant,
    Operator,
}

/// Operator family used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpCategory {
    Layer,
    Activation,
    Normalization,
    Pool,
    Shape,
    Tensor,
    Transform,
    Other,
}

/// Family of an operator type. Unlisted types are [`OpCategory::Other`].
pub fn op_category(op_type: &str) -> OpCategory {
    use OpCategory::*;
    match op_type {
        "Conv" | "ConvAddRelu" | "ConvClip" | "ConvExSwish" | "ConvLeakyRelu"
        | "ConvLeakyReluAdd" | "ConvRelu" | "ConvReluAdd" | "ConvSigmoid" | "ConvTranspose"
        | "ConvolutionLayer" | "TensorScale" | "VSI_NN_OP_CONV2D" | "VSI_NN_OP_CONV_RELU"
        | "VSI_NN_OP_CONV_RELU_POOL" | "VSI_NN_OP_DECONVOLUTION" | "VSI_NN_OP_FCL"
        | "VSI_NN_OP_FCL_RELU" | "VSI_NN_OP_LSTM" => Layer,
        "ActivationLayer" | "HardSigmoid" | "LeakyRelu" | "LeakyReluLayer" | "Relu"
        | "Sigmoid" | "SoftMax2" | "Softmax" | "Softmax2Layer" | "exSoftmax13" | "exSwish"
        | "VSI_NN_OP_LEAKY_RELU" | "VSI_NN_OP_LEAKY_SIGMOID" | "VSI_NN_OP_MISH"
        | "VSI_NN_OP_PRELU" | "VSI_NN_OP_RELU" | "VSI_NN_OP_RELUN" | "VSI_NN_OP_SIGMOID"
        | "VSI_NN_OP_SOFTMAX" | "VSI_NN_OP_SWISH" => Activation,
        "BatchNormalization" | "BatchNormalizationLayer" | "VSI_NN_OP_BATCH_NORM"
        | "VSI_NN_OP_INSTANCE_NORM" | "VSI_NN_OP_LRN" => Normalization,
        "AveragePool" | "MaxPool" | "PoolingLayer2" | "VSI_NN_OP_POOL" => Pool,
        "Reshape" | "VSI_NN_OP_PERMUTE" | "VSI_NN_OP_RESHAPE" | "VSI_NN_OP_RESIZE" => Shape,
        "Concat" | "Pad" | "Slice" | "Split" | "VSI_NN_OP_CONCAT" | "VSI_NN_OP_STRIDED_SLICE" => {
            Tensor
        }
        "TensorTranspose" | "Transpose" => Transform,
        _ => Other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderNode {
    /// Stable key: `n{id}` for operators, `t{id}` for tensor pseudo nodes.
    pub key: String,
    pub label: String,
    pub category: NodeCategory,
    /// Set for [`NodeCategory::Operator`] nodes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_category: Option<OpCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Projection switches.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    /// Label edges with the carried tensor's shape.
    pub shape_labels: bool,
    /// Emit pseudo nodes for producer-less graph inputs.
    pub show_inputs: bool,
    /// Emit pseudo nodes for constant operands.
    pub show_constants: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            shape_labels: true,
            show_inputs: true,
            show_constants: false,
        }
    }
}

/// Abstract drawable graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl RenderGraph {
    /// Project `graph` according to `opts`.
    pub fn build(graph: &Graph, opts: ViewOptions) -> Self {
        let mut out = RenderGraph::default();
        let mut pseudo: HashMap<TensorId, String> = HashMap::new();

        for node in graph.nodes() {
            let category = category_of(node);
            out.nodes.push(RenderNode {
                key: node_key(node),
                label: node.label(),
                category,
                op_category: (category == NodeCategory::Operator)
                    .then(|| op_category(&node.op_type)),
            });
        }

        for node in graph.nodes() {
            let to = node_key(node);
            for &tensor in &node.inputs {
                let label = if opts.shape_labels {
                    graph.shape_label(tensor)
                } else {
                    None
                };
                let from = match graph.producer_node(tensor) {
                    Some(producer) => node_key(producer),
                    None => {
                        let category = match graph.tensor_role(tensor) {
                            TensorRole::GraphInput if opts.show_inputs => NodeCategory::Input,
                            TensorRole::Constant if opts.show_constants => NodeCategory::Constant,
                            _ => continue,
                        };
                        pseudo
                            .entry(tensor)
                            .or_insert_with(|| {
                                let key = format!("t{tensor}");
                                let label = graph
                                    .tensor(tensor)
                                    .map(|t| t.name.clone())
                                    .filter(|name| !name.is_empty())
                                    .unwrap_or_else(|| format!("tensor_{tensor}"));
                                out.nodes.push(RenderNode {
                                    key: key.clone(),
                                    label,
                                    category,
                                    op_category: None,
                                });
                                key
                            })
                            .clone()
                    }
                };
                out.edges.push(RenderEdge {
                    from,
                    to: to.clone(),
                    label,
                });
            }
        }

        out
    }
}

fn node_key(node: &Node) -> String {
    format!("n{}", node.id)
}

fn category_of(node: &Node) -> NodeCategory {
    match node.op_type.as_str() {
        INPUT_OPERATOR => NodeCategory::Input,
        OUTPUT_OPERATOR => NodeCategory::Output,
        _ => NodeCategory::Operator,
    }
}
