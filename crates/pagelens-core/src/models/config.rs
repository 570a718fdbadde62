//! Configuration structures for pagelens.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagelensConfig {
    /// Engine configuration.
    pub engine: EngineConfig,

    /// Recognition model configuration.
    pub model: ModelConfig,
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend variables applied to every new engine, by name.
    pub variables: BTreeMap<String, String>,
}

/// Recognition model location and language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX recognition model used when none is given on the command line.
    pub model_path: Option<PathBuf>,

    /// Language code(s), `+`-separated.
    pub lang: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            lang: "eng".to_string(),
        }
    }
}

impl PagelensConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
