//! `rknn graph`: render-facing graph projection.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Result};
use rknn_core::{RenderGraph, ViewOptions};
use rknn_format::RknnModel;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GraphOutput {
    pub graph: RenderGraph,
    pub op_histogram: BTreeMap<String, usize>,
}

pub fn run(model: &Path, config: Option<&Path>, shapes: bool, constants: bool) -> Result<()> {
    let decoded = super::load_model(model, config)?;
    let output = project(&decoded, shapes, constants)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn project(model: &RknnModel, shapes: bool, constants: bool) -> Result<GraphOutput> {
    let Some(graph) = model.graph.as_ref() else {
        bail!(
            "no compute graph recovered from '{}' ({} dialect)",
            model.metadata.name,
            model.dialect.name()
        );
    };
    let options = ViewOptions {
        shape_labels: shapes,
        show_constants: constants,
        ..ViewOptions::default()
    };
    tracing::debug!("{}", graph.summary());
    Ok(GraphOutput {
        graph: RenderGraph::build(graph, options),
        op_histogram: graph.op_histogram(),
    })
}
