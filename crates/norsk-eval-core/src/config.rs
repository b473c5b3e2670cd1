//! Run configuration.
//!
//! An [`EvalConfig`] is assembled once at startup (defaults, then an optional
//! TOML file, then command-line overrides), validated, and handed to the
//! orchestrator behind an `Arc`. Nothing reads configuration after that.
//!
//! ```toml
//! endpoint = "http://localhost:11434"
//! concurrency = 2
//!
//! [generation]
//! num_predict = 250
//! temperature = 0.7
//!
//! [retry]
//! max_retries = 2
//! timeout_ms = 300000
//!
//! [[models]]
//! name = "Mistral-7B"
//! id = "mistral:7b"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::ollama::DEFAULT_ENDPOINT;
use crate::client::{GenerationOptions, RetryPolicy};
use crate::domain::{ConfigError, ModelTarget, PresetSelection};

/// Immutable settings for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// Base URL of the serving runtime.
    pub endpoint: String,
    pub generation: GenerationOptions,
    pub retry: RetryPolicy,
    /// Maximum pairs in flight. 1 runs sequentially.
    pub concurrency: usize,
    /// Models under evaluation, in report order. Empty means "use presets".
    pub models: Vec<ModelTarget>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            generation: GenerationOptions::default(),
            retry: RetryPolicy::default(),
            concurrency: 1,
            models: Vec::new(),
        }
    }
}

/// Values given on the command line. `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub num_predict: Option<u32>,
    pub temperature: Option<f32>,
    /// Explicit models; replace any models from the file.
    pub models: Vec<ModelTarget>,
    /// Preset family used when no models are configured.
    pub presets: PresetSelection,
}

impl EvalConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(path, &text)?;
        debug!(path = %path.display(), models = config.models.len(), "loaded config file");
        Ok(config)
    }

    /// Parse TOML text; `path` only labels errors.
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then `file` (if any), then `overrides`; validated.
    pub fn resolve(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and fill in preset models when none are set.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.retry.max_retries = max_retries;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.retry.timeout_ms = secs.saturating_mul(1_000);
        }
        if let Some(num_predict) = overrides.num_predict {
            self.generation.num_predict = num_predict;
        }
        if let Some(temperature) = overrides.temperature {
            self.generation.temperature = temperature;
        }

        if !overrides.models.is_empty() {
            self.models = overrides.models;
        } else if self.models.is_empty() {
            self.models = overrides.presets.models();
        } else if overrides.presets != PresetSelection::All {
            warn!(
                presets = ?overrides.presets,
                "models are configured explicitly; preset selection ignored"
            );
        }
    }

    /// Reject configurations that would fail or be ambiguous mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::Invalid("no models selected".to_string()));
        }

        let mut names = HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "model `{}` has an empty name",
                    model.id
                )));
            }
            if model.id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "model `{}` has an empty id",
                    model.name
                )));
            }
            if !names.insert(model.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate model name `{}`",
                    model.name
                )));
            }
        }

        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::Invalid(format!("endpoint `{}` is not a URL: {e}", self.endpoint))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "endpoint `{}` must use http or https",
                self.endpoint
            )));
        }

        if !self.generation.temperature.is_finite() || self.generation.temperature < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be a non-negative number, got {}",
                self.generation.temperature
            )));
        }

        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelGroup;
    use std::io::Write;

    fn model(name: &str, id: &str) -> ModelTarget {
        ModelTarget::new(name, id, ModelGroup::Custom)
    }

    #[test]
    fn defaults_fall_back_to_all_presets() {
        let config = EvalConfig::resolve(None, ConfigOverrides::default()).unwrap();
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.models.len(), 4);
        assert_eq!(config.models[0].group, ModelGroup::Norwegian);
    }

    #[test]
    fn preset_flags_restrict_models() {
        let config = EvalConfig::resolve(
            None,
            ConfigOverrides {
                presets: PresetSelection::InternationalOnly,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.models.len(), 3);
        assert!(config
            .models
            .iter()
            .all(|m| m.group == ModelGroup::International));
    }

    #[test]
    fn parses_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
endpoint = "http://gpu-box:11434"
concurrency = 3

[generation]
temperature = 0.2

[retry]
max_retries = 4

[[models]]
name = "Mistral-7B"
id = "mistral:7b"
"#
        )
        .unwrap();

        let config = EvalConfig::resolve(Some(file.path()), ConfigOverrides::default()).unwrap();
        assert_eq!(config.endpoint, "http://gpu-box:11434");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.generation.num_predict, 250);
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.timeout_ms, 300_000);
        assert_eq!(config.models, vec![model("Mistral-7B", "mistral:7b")]);
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let mut config = EvalConfig::parse(
            Path::new("eval.toml"),
            "endpoint = \"http://a:1\"\n[[models]]\nname = \"x\"\nid = \"x\"\n",
        )
        .unwrap();
        config.apply(ConfigOverrides {
            endpoint: Some("http://b:2".into()),
            timeout_secs: Some(30),
            models: vec![model("y", "y:1")],
            ..Default::default()
        });
        assert_eq!(config.endpoint, "http://b:2");
        assert_eq!(config.retry.timeout_ms, 30_000);
        assert_eq!(config.models, vec![model("y", "y:1")]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EvalConfig::parse(Path::new("eval.toml"), "endpiont = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EvalConfig::load(Path::new("/nonexistent/eval.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let config = EvalConfig {
            models: vec![model("a", "a:1"), model("a", "a:2")],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate model name `a`"));
    }

    #[test]
    fn validate_rejects_zero_concurrency_and_bad_endpoint() {
        let base = EvalConfig {
            models: vec![model("a", "a:1")],
            ..Default::default()
        };
        assert!(base.validate().is_ok());

        let zero = EvalConfig {
            concurrency: 0,
            ..base.clone()
        };
        assert!(zero.validate().is_err());

        let bad_url = EvalConfig {
            endpoint: "localhost 11434".into(),
            ..base.clone()
        };
        assert!(bad_url.validate().is_err());

        let ftp = EvalConfig {
            endpoint: "ftp://localhost".into(),
            ..base
        };
        assert!(ftp.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_model_list() {
        let config = EvalConfig::default();
        assert!(config.validate().is_err());
    }
}
