//! Compute graph model for decoded RKNN models.
//!
//! Decoders hand over a node list and a tensor map; [`Graph`] derives the
//! producer index and answers tensor, producer, and edge queries. The
//! [`view`] module projects a graph into the abstract node/edge form the
//! visualization renderer consumes.

pub mod graph;
pub mod view;

pub use graph::node::{Node, NodeId};
pub use graph::tensor::{DataType, QuantInfo, Tensor, TensorId};
pub use graph::{Edge, Graph, GraphError, ProducerConflict, TensorRole};
pub use view::{op_category, NodeCategory, OpCategory, RenderEdge, RenderGraph, RenderNode, ViewOptions};
