//! `rknn info`: model report.

use std::path::Path;

use anyhow::Result;
use rknn_format::RknnModel;

pub fn run(model: &Path, config: Option<&Path>) -> Result<()> {
    let decoded = super::load_model(model, config)?;
    println!("{}", render(&decoded)?);
    Ok(())
}

/// Pretty JSON of the model report.
pub fn render(model: &RknnModel) -> Result<String> {
    Ok(serde_json::to_string_pretty(&model.report())?)
}
