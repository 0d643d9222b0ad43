//! Decoder configuration.
//!
//! Loaded from TOML, e.g.:
//!
//! ```toml
//! parse_schema = true
//! locate_vpmn = true
//!
//! [[header_layout]]
//! version = 0x1006
//! size = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::header::LEGACY_HEADER_SIZE;

/// Forces the header size used for one exact version value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLayoutOverride {
    pub version: u64,
    pub size: usize,
}

/// Knobs for one decode invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Decode the schema section. When off, the section is still sliced and
    /// bounds-checked but no graph is built from it.
    pub parse_schema: bool,
    /// Look for an embedded VPMN region when the schema section yields no
    /// graph.
    pub locate_vpmn: bool,
    /// Per-version header sizes that take precedence over the built-in table.
    pub header_layout: Vec<HeaderLayoutOverride>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            parse_schema: true,
            locate_vpmn: true,
            header_layout: Vec::new(),
        }
    }
}

impl DecoderConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML configuration string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: DecoderConfig =
            toml::from_str(toml_str).map_err(|e| FormatError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FormatError::Config(e.to_string()))
    }

    /// Reject overrides smaller than the fixed fields every header carries.
    pub fn validate(&self) -> Result<()> {
        for layout in &self.header_layout {
            if layout.size < LEGACY_HEADER_SIZE {
                return Err(FormatError::Config(format!(
                    "header size {} for version {:#x} is below the {LEGACY_HEADER_SIZE}-byte minimum",
                    layout.size, layout.version
                )));
            }
        }
        Ok(())
    }

    /// Configured header size for an exact version, if any.
    pub fn header_size_override(&self, version: u64) -> Option<usize> {
        self.header_layout
            .iter()
            .find(|l| l.version == version)
            .map(|l| l.size)
    }
}
