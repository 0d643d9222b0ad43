//! Synthetic container fixtures shared by the integration tests.

#![allow(dead_code)]

use flatbuffers::{FlatBufferBuilder, WIPOffset};
use rknn_format::header::{DEVICE_HEADER_SIZE, LEGACY_HEADER_SIZE, MAGIC, MODERN_HEADER_SIZE};
use rknn_format::schema::fbs;
use rknn_format::vpmn::{descriptor_end, entry_size, reserved_block_size, VPMN_MAGIC};

pub struct TensorDef {
    pub name: &'static str,
    pub shape: Vec<i32>,
    pub dtype: Option<&'static str>,
    pub constant: bool,
}

impl TensorDef {
    pub fn new(name: &'static str, shape: &[i32]) -> Self {
        Self {
            name,
            shape: shape.to_vec(),
            dtype: Some("float16"),
            constant: false,
        }
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }
}

pub struct NodeDef {
    pub op: &'static str,
    pub name: &'static str,
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
}

pub fn node(op: &'static str, name: &'static str, inputs: &[i32], outputs: &[i32]) -> NodeDef {
    NodeDef {
        op,
        name,
        inputs: inputs.to_vec(),
        outputs: outputs.to_vec(),
    }
}

/// FlatBuffers `Model` with a single graph.
pub fn schema_bytes(
    generator: Option<&str>,
    tensors: &[TensorDef],
    nodes: &[NodeDef],
    inputs: &[i32],
    outputs: &[i32],
) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();

    let mut tensor_offsets = Vec::new();
    for t in tensors {
        let name = fbb.create_string(t.name);
        let shape = fbb.create_vector(&t.shape);
        let dtype = t.dtype.map(|d| fbb.create_string(d));
        let start = fbb.start_table();
        fbb.push_slot_always(fbs::Tensor::VT_NAME, name);
        fbb.push_slot_always(fbs::Tensor::VT_SHAPE, shape);
        if let Some(dtype) = dtype {
            fbb.push_slot_always(fbs::Tensor::VT_DATA_TYPE, dtype);
        }
        fbb.push_slot::<bool>(fbs::Tensor::VT_IS_CONST, t.constant, false);
        tensor_offsets.push(fbb.end_table(start));
    }

    let mut node_offsets = Vec::new();
    for n in nodes {
        let op = fbb.create_string(n.op);
        let name = fbb.create_string(n.name);
        let ins = fbb.create_vector(&n.inputs);
        let outs = fbb.create_vector(&n.outputs);
        let start = fbb.start_table();
        fbb.push_slot_always(fbs::Node::VT_TYPE, op);
        fbb.push_slot_always(fbs::Node::VT_NAME, name);
        fbb.push_slot_always(fbs::Node::VT_INPUTS, ins);
        fbb.push_slot_always(fbs::Node::VT_OUTPUTS, outs);
        node_offsets.push(fbb.end_table(start));
    }

    let tensor_vec = fbb.create_vector(&tensor_offsets);
    let node_vec = fbb.create_vector(&node_offsets);
    let graph_inputs = fbb.create_vector(inputs);
    let graph_outputs = fbb.create_vector(outputs);
    let start = fbb.start_table();
    fbb.push_slot_always(fbs::Graph::VT_TENSORS, tensor_vec);
    fbb.push_slot_always(fbs::Graph::VT_NODES, node_vec);
    fbb.push_slot_always(fbs::Graph::VT_INPUTS, graph_inputs);
    fbb.push_slot_always(fbs::Graph::VT_OUTPUTS, graph_outputs);
    let graph = fbb.end_table(start);

    let graphs = fbb.create_vector(&[graph]);
    let format = fbb.create_string("RKNN");
    let compiler = fbb.create_string("toolkit-1.6.0");
    let generator: Option<WIPOffset<&str>> = generator.map(|g| fbb.create_string(g));
    let start = fbb.start_table();
    fbb.push_slot_always(fbs::Model::VT_FORMAT, format);
    fbb.push_slot_always(fbs::Model::VT_COMPILER, compiler);
    if let Some(generator) = generator {
        fbb.push_slot_always(fbs::Model::VT_GENERATOR, generator);
    }
    fbb.push_slot_always(fbs::Model::VT_GRAPHS, graphs);
    let model = fbb.end_table(start);

    fbb.finish(model, None);
    fbb.finished_data().to_vec()
}

/// Header size the decoder derives for `version`.
pub fn header_size_for(version: u64) -> usize {
    match (version & 0xFF, version >> 8) {
        (0..=1, _) => LEGACY_HEADER_SIZE,
        (_, 0x10) => DEVICE_HEADER_SIZE,
        _ => MODERN_HEADER_SIZE,
    }
}

/// RKNN container. Legacy versions store `schema.len()` in the length field
/// but never get the schema bytes written.
pub fn container(version: u64, schema: &[u8], metadata: &str, trailing: &[u8]) -> Vec<u8> {
    let header_size = header_size_for(version);
    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&[0; 4]);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&(schema.len() as u64).to_le_bytes());
    buf.resize(header_size, 0);
    if header_size != LEGACY_HEADER_SIZE {
        buf.extend_from_slice(schema);
    }
    buf.extend_from_slice(&(metadata.len() as u64).to_le_bytes());
    buf.extend_from_slice(metadata.as_bytes());
    buf.extend_from_slice(trailing);
    buf
}

/// VPMN region with its node table right after the descriptors.
pub fn vpmn_blob(major: u16, name: &str, ops: &[(&str, u32)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&VPMN_MAGIC);
    buf.extend_from_slice(&major.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&[0; 4]);
    let mut name_field = [0u8; 64];
    name_field[..name.len()].copy_from_slice(name.as_bytes());
    buf.extend_from_slice(&name_field);
    buf.extend_from_slice(&(ops.len() as u32).to_le_bytes());
    buf.resize(buf.len() + reserved_block_size(major), 0);

    let table_offset = descriptor_end(major) as u32;
    let table_size = (ops.len() * entry_size(major)) as u32;
    for field in [0u32, 1, 0, 1, table_offset, table_size] {
        buf.extend_from_slice(&field.to_le_bytes());
    }
    for (op, id) in ops {
        let mut op_field = [0u8; 64];
        op_field[..op.len()].copy_from_slice(op.as_bytes());
        buf.extend_from_slice(&op_field);
        buf.extend_from_slice(&id.to_le_bytes());
        buf.resize(buf.len() + entry_size(major) - 68, 0);
    }
    buf
}

pub const METADATA: &str = r#"{
    "name": "conv_relu",
    "version": "1.6.0",
    "target_platform": ["rk3588"],
    "norm_tensor": [
        {"tensor_id": 0, "url": "images", "size": [1, 3, 224, 224], "dtype": "float16", "layout": "NCHW"},
        {"tensor_id": 6, "url": "output", "size": [1, 16, 222, 222], "dtype": "float16"}
    ],
    "graph": [
        {"left": "input", "left_tensor_id": 0, "right": "Conv2D_0", "right_tensor_id": 0},
        {"left": "output", "left_tensor_id": 0, "right": "Relu_1", "right_tensor_id": 6}
    ]
}"#;

pub const GENERATOR: &str = "{'attrs': {'images': {'layout': 'NHWC', 'layout_ori': 'NCHW'}}, \
    'quant_tab': {'output': {'dtype': 'int8', 'quant_method': 'layer', \
    'quant_type': 'asymmetric_quantized', 'scale': [0.025], 'zero_point': [-128]}}, \
    'optimize': True}";

/// Conv2D (tensors 0, 1, 2 -> 5) followed by Relu (5 -> 6); 1 and 2 are weights.
pub fn conv_relu_schema(generator: Option<&str>) -> Vec<u8> {
    let tensors = vec![
        TensorDef::new("images", &[1, 3, 224, 224]),
        TensorDef::new("conv.weight", &[16, 3, 3, 3]).constant(),
        TensorDef::new("conv.bias", &[16]).constant(),
        TensorDef::new("unused_3", &[]),
        TensorDef::new("unused_4", &[]),
        TensorDef::new("conv_out", &[1, 16, 222, 222]),
        TensorDef::new("output", &[1, 16, 222, 222]),
    ];
    let nodes = vec![
        node("Conv2D", "conv", &[0, 1, 2], &[5]),
        node("Relu", "relu", &[5], &[6]),
    ];
    schema_bytes(generator, &tensors, &nodes, &[0], &[6])
}
