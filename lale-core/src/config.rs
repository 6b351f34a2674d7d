//! Configuration system for lale.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from the user config directory and/or `.lale/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Top-level lale configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaleConfig {
    /// Tracing output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Fairness metric configuration.
    #[serde(default)]
    pub fairness: FairnessSettings,
    /// Train/test splitting defaults.
    #[serde(default)]
    pub split: SplitConfig,
    /// Dataset location configuration.
    #[serde(default)]
    pub data: DataConfig,
}

/// Tracing output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive for the stderr layer (e.g. `info`, `lale_core=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily-rotated JSON logs. Disabled when unset.
    #[serde(default)]
    pub json_log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fairness metric configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessSettings {
    /// Symmetric disparate impact at or above this value counts as fair in
    /// the combined accuracy/R² scorers.
    #[serde(default = "default_di_threshold")]
    pub disparate_impact_threshold: f64,
    /// Value returned by a metric whose denominator is undefined.
    #[serde(default)]
    pub ill_defined_value: f64,
}

impl Default for FairnessSettings {
    fn default() -> Self {
        Self {
            disparate_impact_threshold: default_di_threshold(),
            ill_defined_value: 0.0,
        }
    }
}

fn default_di_threshold() -> f64 {
    0.9
}

/// Train/test splitting defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the test split (0.0-1.0).
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Number of folds for k-fold splitting.
    #[serde(default = "default_n_splits")]
    pub n_splits: usize,
    /// Shuffle rows within each stratum before assignment.
    #[serde(default = "default_true")]
    pub shuffle: bool,
    /// Seed for shuffling.
    #[serde(default = "default_random_state")]
    pub random_state: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            n_splits: default_n_splits(),
            shuffle: true,
            random_state: default_random_state(),
        }
    }
}

fn default_test_size() -> f64 {
    0.33
}

fn default_n_splits() -> usize {
    3
}

fn default_random_state() -> Option<u64> {
    Some(42)
}

/// Dataset location configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding local copies of the benchmark CSV files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    ".lale/datasets".to_string()
}

fn default_true() -> bool {
    true
}

impl DataConfig {
    /// Path of `<data_dir>/<file_name>`, relative to `workspace` when the data
    /// dir is relative.
    pub fn dataset_path(&self, workspace: &Path, file_name: &str) -> PathBuf {
        let dir = PathBuf::from(&self.data_dir);
        if dir.is_absolute() {
            dir.join(file_name)
        } else {
            workspace.join(dir).join(file_name)
        }
    }
}

/// Explicit settings for [`load_config`]. Only the values that were set
/// replace those of the lower layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigOverrides {
    sections: BTreeMap<&'static str, Map<String, Value>>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn set(mut self, section: &'static str, key: &str, value: impl Into<Value>) -> Self {
        self.sections
            .entry(section)
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    pub fn log_level(self, level: impl Into<String>) -> Self {
        self.set("logging", "level", level.into())
    }

    pub fn json_log_dir(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_string_lossy().into_owned();
        self.set("logging", "json_log_dir", dir)
    }

    pub fn disparate_impact_threshold(self, threshold: f64) -> Self {
        self.set("fairness", "disparate_impact_threshold", threshold)
    }

    pub fn ill_defined_value(self, value: f64) -> Self {
        self.set("fairness", "ill_defined_value", value)
    }

    pub fn test_size(self, test_size: f64) -> Self {
        self.set("split", "test_size", test_size)
    }

    pub fn n_splits(self, n_splits: usize) -> Self {
        self.set("split", "n_splits", n_splits)
    }

    pub fn shuffle(self, shuffle: bool) -> Self {
        self.set("split", "shuffle", shuffle)
    }

    pub fn random_state(self, seed: u64) -> Self {
        self.set("split", "random_state", seed)
    }

    pub fn data_dir(self, dir: impl Into<String>) -> Self {
        self.set("data", "data_dir", dir.into())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (only the fields set on the [`ConfigOverrides`])
/// 2. Environment variables (prefixed with `LALE_`)
/// 3. Workspace-local config (`.lale/config.toml`)
/// 4. User config (`<config dir>/lale/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<LaleConfig> {
    let mut figment = Figment::from(Serialized::defaults(LaleConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "lale", "lale") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".lale").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // LALE_SPLIT__TEST_SIZE, LALE_FAIRNESS__DISPARATE_IMPACT_THRESHOLD, etc.
    figment = figment.merge(Env::prefixed("LALE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config = figment.extract().map_err(Box::new)?;
    Ok(config)
}
