//! Model targets and the built-in presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Which preset family a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelGroup {
    /// Models tuned on Norwegian text.
    Norwegian,
    /// General-purpose international baselines.
    International,
    /// Models supplied on the command line or in a config file.
    Custom,
}

impl Default for ModelGroup {
    fn default() -> Self {
        Self::Custom
    }
}

/// One language model under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelTarget {
    /// Display name used in reports.
    pub name: String,
    /// Identifier understood by the serving runtime (e.g. `llama3.2:3b`).
    pub id: String,
    #[serde(default)]
    pub group: ModelGroup,
}

impl ModelTarget {
    pub fn new(name: impl Into<String>, id: impl Into<String>, group: ModelGroup) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            group,
        }
    }

    /// Parse `NAME=ID` or a bare `ID` (name defaults to the id).
    pub fn parse_spec(spec: &str) -> Result<Self, ConfigError> {
        let spec = spec.trim();
        let (name, id) = match spec.split_once('=') {
            Some((name, id)) => (name.trim(), id.trim()),
            None => (spec, spec),
        };
        if name.is_empty() || id.is_empty() {
            return Err(ConfigError::InvalidModelSpec(spec.to_string()));
        }
        Ok(Self::new(name, id, ModelGroup::Custom))
    }
}

impl FromStr for ModelTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_spec(s)
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.id {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// Norwegian-tuned preset models.
pub fn norwegian_models() -> Vec<ModelTarget> {
    vec![ModelTarget::new(
        "NB-Llama-3.2-3B",
        "hf.co/NbAiLab/nb-llama-3.2-3B-Q4_K_M-GGUF:latest",
        ModelGroup::Norwegian,
    )]
}

/// International baseline preset models.
pub fn international_models() -> Vec<ModelTarget> {
    vec![
        ModelTarget::new("Llama-3.2-3B", "llama3.2:3b", ModelGroup::International),
        ModelTarget::new("Mistral-7B", "mistral:7b", ModelGroup::International),
        ModelTarget::new("Llama-3.1-8B", "llama3.1:8b", ModelGroup::International),
    ]
}

/// Which presets to use when no models are given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresetSelection {
    #[default]
    All,
    NorwegianOnly,
    InternationalOnly,
}

impl PresetSelection {
    pub fn models(self) -> Vec<ModelTarget> {
        match self {
            Self::All => {
                let mut models = norwegian_models();
                models.extend(international_models());
                models
            }
            Self::NorwegianOnly => norwegian_models(),
            Self::InternationalOnly => international_models(),
        }
    }
}
