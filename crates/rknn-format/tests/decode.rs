//! End-to-end decoding of synthetic containers.

mod common;

use common::*;
use rknn_core::{DataType, TensorRole, ViewOptions};
use rknn_format::header::LayoutSource;
use rknn_format::{
    DecoderConfig, Dialect, FormatError, GraphSource, HeaderLayoutOverride, Revision, RknnModel,
};

fn decode(data: &[u8]) -> RknnModel {
    RknnModel::from_bytes(data, &DecoderConfig::default()).expect("decode container")
}

#[test]
fn conv_relu_producer_resolution() {
    let data = container(0x0006, &conv_relu_schema(None), METADATA, &[]);
    let model = decode(&data);

    assert!(matches!(model.dialect, Dialect::Modern(_)));
    assert_eq!(model.graph_source, GraphSource::Schema);
    let graph = model.graph.as_ref().expect("schema graph");
    assert_eq!(graph.node_count(), 2);

    let producer = graph.producer_node(5).expect("tensor 5 has a producer");
    assert_eq!(producer.op_type, "Conv2D");
    assert_eq!(graph.producer_node(6).map(|n| n.op_type.as_str()), Some("Relu"));
    assert_eq!(graph.producer(0), None);

    assert_eq!(graph.tensor_role(0), TensorRole::GraphInput);
    assert_eq!(graph.tensor_role(1), TensorRole::Constant);
    assert_eq!(graph.tensor_role(5), TensorRole::Produced);

    let edges = graph.edges();
    assert_eq!(edges.len(), 1, "only conv -> relu is producer-resolved");
    assert_eq!((edges[0].from, edges[0].to, edges[0].tensor), (0, 1, 5));
    assert_eq!(graph.shape_label(5).as_deref(), Some("[1, 16, 222, 222]"));
}

#[test]
fn every_declared_output_resolves_to_its_node() {
    let data = container(0x0006, &conv_relu_schema(None), METADATA, &[]);
    let model = decode(&data);
    let graph = model.graph.expect("schema graph");
    for node in graph.nodes() {
        for &out in &node.outputs {
            assert_eq!(graph.producer(out), Some(node.id), "tensor {out}");
        }
    }
}

#[test]
fn metadata_and_schema_info() {
    let data = container(0x0006, &conv_relu_schema(None), METADATA, &[]);
    let model = decode(&data);
    assert_eq!(model.metadata.name, "conv_relu");
    assert_eq!(model.metadata.version, "1.6.0");
    assert_eq!(model.metadata.target_platform, vec!["rk3588"]);

    let schema = model.schema.as_ref().expect("schema info");
    assert_eq!(schema.format.as_deref(), Some("RKNN"));
    assert_eq!(schema.compiler.as_deref(), Some("toolkit-1.6.0"));
    assert_eq!(schema.num_graphs, 1);
    assert!(model.generator.is_none());

    assert_eq!(model.inputs().len(), 1);
    assert_eq!(model.inputs()[0].name, "images");
    assert_eq!(model.inputs()[0].layout.as_deref(), Some("NCHW"));
    assert_eq!(model.outputs()[0].tensor_id, 6);
}

#[test]
fn generator_attributes_are_merged() {
    let data = container(0x0006, &conv_relu_schema(Some(GENERATOR)), METADATA, &[]);
    let model = decode(&data);

    let generator = model.generator.as_ref().expect("generator parsed");
    assert_eq!(generator.raw["optimize"], serde_json::json!(true));

    let input = &model.inputs()[0];
    assert_eq!(input.layout.as_deref(), Some("NHWC"));
    assert_eq!(input.layout_ori.as_deref(), Some("NCHW"));
    assert!(input.quant_info.is_none());

    let output = &model.outputs()[0];
    assert_eq!(output.dtype, Some(DataType::Named("int8".into())));
    let quant = output.quant_info.as_ref().expect("quant info");
    assert_eq!(quant.method.as_deref(), Some("layer"));
    assert_eq!(quant.scale, vec![0.025]);
    assert_eq!(quant.zero_point, vec![-128]);
}

#[test]
fn malformed_generator_degrades_to_absent() {
    let data = container(0x0006, &conv_relu_schema(Some("{{ nope")), METADATA, &[]);
    let model = decode(&data);
    assert!(model.generator.is_none());
    assert_eq!(model.graph_source, GraphSource::Schema);
    assert_eq!(model.outputs()[0].dtype, Some(DataType::Named("float16".into())));
}

#[test]
fn device_specific_revision_falls_back_to_embedded_vpmn() {
    let mut schema = b"\x01\x02opaque-device-blob".to_vec();
    schema.extend(vpmn_blob(4, "yolo", &[("Conv", 10), ("Sigmoid", 11)]));
    let data = container(0x1006, &schema, METADATA, &[]);
    let model = decode(&data);

    let header = model.header().expect("wrapped container");
    assert_eq!(header.revision, Revision::DeviceSpecific);
    assert_eq!(header.size, 72);
    assert_eq!(header.layout, LayoutSource::Verified);

    assert!(model.schema.is_none());
    assert_eq!(model.graph_source, GraphSource::Vpmn);
    let graph = model.graph.as_ref().expect("vpmn graph");
    let ops: Vec<_> = graph.nodes().map(|n| (n.id, n.op_type.as_str())).collect();
    assert_eq!(ops, [(10, "Conv"), (11, "Sigmoid")]);
    assert_eq!(model.vpmn.as_ref().map(|v| v.name.as_str()), Some("yolo"));
}

#[test]
fn device_specific_revision_without_vpmn_is_unavailable() {
    let data = container(0x1006, b"opaque", METADATA, &[]);
    let model = decode(&data);
    assert_eq!(model.graph_source, GraphSource::Unavailable);
    assert!(model.graph.is_none());
    assert_eq!(model.metadata.name, "conv_relu");
}

#[test]
fn stray_vpmn_signature_in_schema_blob_is_skipped() {
    let data = container(0x1006, b"opaque..VPMN..device-blob", METADATA, &[]);
    let model = decode(&data);
    assert_eq!(model.graph_source, GraphSource::Unavailable);
    assert!(model.graph.is_none());
    assert_eq!(model.metadata.name, "conv_relu");
}

#[test]
fn stray_vpmn_signature_in_trailing_bytes_is_skipped() {
    for version in [0x0001, 0x1006] {
        let data = container(version, b"opaque", METADATA, b"xxVPMNyy");
        let model = decode(&data);
        assert_eq!(model.graph_source, GraphSource::Unavailable, "version {version:#x}");
        assert!(model.vpmn.is_none());
    }
}

#[test]
fn real_vpmn_region_after_stray_signature() {
    // Complete header whose node table points past the end of the file.
    let mut schema = vpmn_blob(4, "first", &[("Conv", 0)]);
    schema.truncate(rknn_format::vpmn::descriptor_end(4));
    let table_offset = schema.len() - 8;
    schema[table_offset..table_offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    schema.extend(vpmn_blob(2, "second", &[("Add", 0)]));
    let data = container(0x1006, &schema, METADATA, &[]);
    let model = decode(&data);
    assert_eq!(model.graph_source, GraphSource::Vpmn);
    assert_eq!(model.vpmn.as_ref().map(|v| v.name.as_str()), Some("second"));
}

#[test]
fn truncated_bare_vpmn_file_is_fatal() {
    let data = vpmn_blob(3, "bare_model", &[("Conv", 0), ("Relu", 1)]);
    let err = RknnModel::from_bytes(&data[..data.len() - 10], &DecoderConfig::default()).unwrap_err();
    assert!(matches!(err, FormatError::TruncatedVpmn { .. }), "got {err:?}");
}

#[test]
fn vpmn_lookup_can_be_disabled() {
    let data = container(0x1006, &vpmn_blob(2, "m", &[("Add", 0)]), METADATA, &[]);
    let config = DecoderConfig {
        locate_vpmn: false,
        ..DecoderConfig::default()
    };
    let model = RknnModel::from_bytes(&data, &config).expect("decode");
    assert_eq!(model.graph_source, GraphSource::Unavailable);
}

#[test]
fn legacy_three_field_dialect() {
    let blob = vpmn_blob(1, "legacy", &[("Pool", 0)]);
    // The length field is nonzero but the legacy dialect has no schema section.
    let data = container(0x0001, b"ignored", METADATA, &blob);
    let model = decode(&data);

    let header = model.header().expect("wrapped container");
    assert!(matches!(model.dialect, Dialect::Legacy3Field(_)));
    assert_eq!(header.size, 24);
    assert_eq!(model.graph_source, GraphSource::Vpmn);
    assert_eq!(model.metadata.name, "conv_relu");
}

#[test]
fn bare_vpmn_file() {
    let data = vpmn_blob(3, "bare_model", &[("Conv", 0), ("Relu", 1)]);
    let model = decode(&data);
    assert!(matches!(model.dialect, Dialect::Vpmn));
    assert!(model.header().is_none());
    assert_eq!(model.metadata.name, "bare_model");
    assert_eq!(model.metadata.version, "Unknown");
    assert_eq!(model.graph.as_ref().map(|g| g.node_count()), Some(2));
}

#[test]
fn header_one_byte_short() {
    let data = container(0x0006, &[], METADATA, &[]);
    let err = RknnModel::from_bytes(&data[..63], &DecoderConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        FormatError::TruncatedHeader {
            expected: 64,
            actual: 63
        }
    ));

    let data = container(0x1006, &[], METADATA, &[]);
    let err = RknnModel::from_bytes(&data[..71], &DecoderConfig::default()).unwrap_err();
    assert!(matches!(err, FormatError::TruncatedHeader { expected: 72, .. }));
}

#[test]
fn bad_magic_and_unknown_sub_revision() {
    let mut data = container(0x0006, &[], METADATA, &[]);
    data[0] = b'X';
    assert!(matches!(
        RknnModel::from_bytes(&data, &DecoderConfig::default()).unwrap_err(),
        FormatError::InvalidMagic { .. }
    ));

    let data = container(0x4206, &[], METADATA, &[]);
    assert!(matches!(
        RknnModel::from_bytes(&data, &DecoderConfig::default()).unwrap_err(),
        FormatError::UnsupportedVersion { .. }
    ));
}

#[test]
fn unverified_version_uses_assumed_layout_unless_overridden() {
    let data = container(0x0009, &conv_relu_schema(None), METADATA, &[]);
    let model = decode(&data);
    let header = model.header().expect("header");
    assert_eq!(header.layout, LayoutSource::Assumed);
    assert_eq!(header.size, 64);

    // Same bytes read with a forced 72-byte header no longer line up.
    let config = DecoderConfig {
        header_layout: vec![HeaderLayoutOverride {
            version: 0x0009,
            size: 72,
        }],
        ..DecoderConfig::default()
    };
    assert!(RknnModel::from_bytes(&data, &config).is_err());
}

#[test]
fn schema_decoding_can_be_disabled() {
    let data = container(0x0006, &conv_relu_schema(Some(GENERATOR)), METADATA, &[]);
    let config = DecoderConfig {
        parse_schema: false,
        ..DecoderConfig::default()
    };
    let model = RknnModel::from_bytes(&data, &config).expect("decode");
    assert!(model.schema.is_none());
    assert!(model.generator.is_none());
    assert_eq!(model.graph_source, GraphSource::Unavailable);
    assert_eq!(model.inputs()[0].layout.as_deref(), Some("NCHW"));
}

#[test]
fn duplicate_producer_keeps_first_node() {
    let tensors = vec![TensorDef::new("x", &[1]), TensorDef::new("y", &[1])];
    let nodes = vec![node("A", "a", &[0], &[1]), node("B", "b", &[0], &[1])];
    let schema = schema_bytes(None, &tensors, &nodes, &[0], &[1]);
    let data = container(0x0006, &schema, METADATA, &[]);
    let model = decode(&data);
    assert_eq!(model.graph_source, GraphSource::Schema);
    let graph = model.graph.as_ref().expect("schema graph");
    assert_eq!(graph.producer(1), Some(0));
    assert_eq!(graph.producer_conflicts().len(), 1);
    assert_eq!(graph.producer_conflicts()[0].ignored, 1);
}

#[test]
fn negative_dimensions_leave_shape_unknown() {
    let tensors = vec![TensorDef::new("x", &[-1, 3, 224, 224]), TensorDef::new("y", &[1, 8])];
    let nodes = vec![node("A", "a", &[0], &[1])];
    let schema = schema_bytes(None, &tensors, &nodes, &[0], &[1]);
    let data = container(0x0006, &schema, METADATA, &[]);
    let graph = decode(&data).graph.expect("schema graph");
    assert!(graph.tensor(0).expect("tensor 0").shape.is_empty());
    assert_eq!(graph.shape_label(0), None);
    assert_eq!(graph.shape_label(1).as_deref(), Some("[1, 8]"));
}

#[test]
fn corrupt_schema_section_is_fatal() {
    let data = container(0x0006, &[0xFF; 16], METADATA, &[]);
    let err = RknnModel::from_bytes(&data, &DecoderConfig::default()).unwrap_err();
    assert!(matches!(err, FormatError::InvalidSchema { .. }));
}

#[test]
fn render_projection() {
    let data = container(0x0006, &conv_relu_schema(None), METADATA, &[]);
    let model = decode(&data);
    let view = model.render(ViewOptions::default()).expect("graph present");

    let keys: Vec<_> = view.nodes.iter().map(|n| n.key.as_str()).collect();
    assert_eq!(keys, ["n0", "n1", "t0"]);
    assert_eq!(view.nodes[0].label, "conv\nConv2D");
    assert!(view
        .edges
        .iter()
        .any(|e| e.from == "n0" && e.to == "n1" && e.label.as_deref() == Some("[1, 16, 222, 222]")));

    let with_constants = model
        .render(ViewOptions {
            show_constants: true,
            ..ViewOptions::default()
        })
        .expect("graph present");
    assert_eq!(with_constants.nodes.len(), 5);
}

#[test]
fn open_from_disk_and_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("model.rknn");
    let data = container(0x0006, &conv_relu_schema(Some(GENERATOR)), METADATA, &[]);
    std::fs::write(&path, &data).expect("write fixture");

    let model = RknnModel::open(&path).expect("open");
    let report = model.report();
    assert_eq!(report.file_size, data.len());
    assert_eq!(report.sha256.len(), 64);
    assert_eq!(report.dialect, "modern");
    assert_eq!(report.version.as_deref(), Some("6.0x0"));
    assert_eq!(report.node_count, 2);

    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["graph_source"], "schema");
    assert_eq!(json["name"], "conv_relu");
    assert_eq!(json["generator"]["optimize"], true);
    assert_eq!(json["metadata"]["version"], "1.6.0");
}

#[test]
fn open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = RknnModel::open(&dir.path().join("absent.rknn")).unwrap_err();
    assert!(matches!(err, FormatError::Io(_)));
}
