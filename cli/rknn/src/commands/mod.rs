//! CLI command implementations.

pub mod graph;
pub mod info;

use std::path::Path;

use anyhow::{Context, Result};
use rknn_format::{DecoderConfig, RknnModel};

/// Load the optional decoder config, then decode `model`.
pub fn load_model(model: &Path, config: Option<&Path>) -> Result<RknnModel> {
    let config = match config {
        Some(path) => DecoderConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DecoderConfig::default(),
    };
    RknnModel::open_with(model, &config).with_context(|| format!("decoding {}", model.display()))
}
