//! Compute graph: operator nodes, tensors, and producer resolution.
//!
//! A graph is built once from a decoded node list and tensor map and is
//! read-only afterwards. Construction derives the producer map (tensor id to
//! the node that emits it) in a single pass over every node's outputs; all
//! edge queries are answered from that map.

pub mod node;
pub mod tensor;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::node::{Node, NodeId};
use self::tensor::{format_shape, Tensor, TensorId};

/// Errors that can occur during graph construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("tensor map key {key} does not match tensor id {id}")]
    TensorKeyMismatch { key: TensorId, id: TensorId },
}

/// How a tensor enters the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorRole {
    /// Emitted by a node in this graph.
    Produced,
    /// No producer; listed as a graph input.
    GraphInput,
    /// No producer; an embedded constant.
    Constant,
    /// No producer and no declaration explaining its origin.
    Unresolved,
}

/// A producer-resolved data dependency: `tensor` flows from `from` into `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub tensor: TensorId,
}

/// A tensor listed as an output of more than one node. The first producer in
/// node order is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConflict {
    pub tensor: TensorId,
    pub kept: NodeId,
    pub ignored: NodeId,
}

/// Compute graph of a decoded model.
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    tensors: BTreeMap<TensorId, Tensor>,
    inputs: Vec<TensorId>,
    outputs: Vec<TensorId>,

    /// Index: node id -> position in `nodes`
    #[serde(skip)]
    node_index: HashMap<NodeId, usize>,
    /// Index: tensor id -> producing node
    #[serde(skip)]
    producers: HashMap<TensorId, NodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    producer_conflicts: Vec<ProducerConflict>,
}

impl Graph {
    /// Build a graph with no explicit input/output lists.
    pub fn new(nodes: Vec<Node>, tensors: BTreeMap<TensorId, Tensor>) -> Result<Self, GraphError> {
        Self::with_io(nodes, tensors, Vec::new(), Vec::new())
    }

    /// Build a graph with its declared input and output tensor ids.
    pub fn with_io(
        nodes: Vec<Node>,
        tensors: BTreeMap<TensorId, Tensor>,
        inputs: Vec<TensorId>,
        outputs: Vec<TensorId>,
    ) -> Result<Self, GraphError> {
        for (&key, tensor) in &tensors {
            if key != tensor.id {
                return Err(GraphError::TensorKeyMismatch { key, id: tensor.id });
            }
        }

        let mut node_index = HashMap::with_capacity(nodes.len());
        let mut producers = HashMap::new();
        let mut producer_conflicts = Vec::new();
        for (pos, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id, pos).is_some() {
                return Err(GraphError::DuplicateNode(node.id));
            }
            for &tensor in &node.outputs {
                match producers.get(&tensor) {
                    Some(&kept) => {
                        tracing::warn!(
                            "tensor {tensor} produced by node {kept} and node {}; keeping node {kept}",
                            node.id
                        );
                        producer_conflicts.push(ProducerConflict {
                            tensor,
                            kept,
                            ignored: node.id,
                        });
                    }
                    None => {
                        producers.insert(tensor, node.id);
                    }
                }
            }
        }

        let graph = Self {
            nodes,
            tensors,
            inputs,
            outputs,
            node_index,
            producers,
            producer_conflicts,
        };
        tracing::debug!("{}", graph.summary());
        Ok(graph)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look up a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&pos| &self.nodes[pos])
    }

    /// Look up a tensor by ID.
    pub fn tensor(&self, id: TensorId) -> Option<&Tensor> {
        self.tensors.get(&id)
    }

    /// Tensors in id order.
    pub fn tensors(&self) -> impl Iterator<Item = &Tensor> {
        self.tensors.values()
    }

    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Declared graph input tensor ids.
    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    /// Declared graph output tensor ids.
    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    /// The node that emits `tensor`, if any.
    pub fn producer(&self, tensor: TensorId) -> Option<NodeId> {
        self.producers.get(&tensor).copied()
    }

    /// Tensors claimed by more than one node, in node order.
    pub fn producer_conflicts(&self) -> &[ProducerConflict] {
        &self.producer_conflicts
    }

    /// The producing node itself.
    pub fn producer_node(&self, tensor: TensorId) -> Option<&Node> {
        self.producer(tensor).and_then(|id| self.node(id))
    }

    /// Classify how a tensor enters the graph.
    pub fn tensor_role(&self, tensor: TensorId) -> TensorRole {
        if self.producers.contains_key(&tensor) {
            TensorRole::Produced
        } else if self.inputs.contains(&tensor) {
            TensorRole::GraphInput
        } else if self.tensors.get(&tensor).is_some_and(|t| t.constant) {
            TensorRole::Constant
        } else {
            TensorRole::Unresolved
        }
    }

    /// Incoming edges of `node`, one per input operand that has a known
    /// producer. Operands without a producer contribute no edge.
    pub fn input_edges(&self, node: &Node) -> Vec<Edge> {
        node.inputs
            .iter()
            .filter_map(|&tensor| {
                self.producer(tensor).map(|from| Edge {
                    from,
                    to: node.id,
                    tensor,
                })
            })
            .collect()
    }

    /// All producer-resolved edges, grouped by consuming node in node order.
    pub fn edges(&self) -> Vec<Edge> {
        self.nodes.iter().flat_map(|n| self.input_edges(n)).collect()
    }

    /// Nodes consuming `tensor`.
    pub fn consumers(&self, tensor: TensorId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.inputs.contains(&tensor))
            .map(|n| n.id)
            .collect()
    }

    /// Shape label such as `[1, 3, 224, 224]`; `None` for unknown tensors
    /// and scalars.
    pub fn shape_label(&self, tensor: TensorId) -> Option<String> {
        self.tensors
            .get(&tensor)
            .filter(|t| !t.shape.is_empty())
            .map(|t| format_shape(&t.shape))
    }

    /// Tensors consumed somewhere but neither produced nor declared.
    pub fn unresolved_tensors(&self) -> Vec<TensorId> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .flat_map(|n| n.inputs.iter().copied())
            .filter(|&t| seen.insert(t) && self.tensor_role(t) == TensorRole::Unresolved)
            .collect()
    }

    /// Node count per op type, sorted by op type.
    pub fn op_histogram(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.op_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        format!(
            "graph: {} nodes, {} tensors, {} inputs, {} outputs, {} producer entries",
            self.nodes.len(),
            self.tensors.len(),
            self.inputs.len(),
            self.outputs.len(),
            self.producers.len(),
        )
    }
}
