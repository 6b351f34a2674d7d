//! Error types for the lale workspace.

use thiserror::Error;

/// Convenience result alias used across the lale crates.
pub type Result<T, E = LaleError> = std::result::Result<T, E>;

/// Configuration errors raised while constructing or validating operators.
///
/// These are fatal at construction time and always name the offending
/// argument so callers can surface them directly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Unknown hyperparameter '{0}'")]
    UnknownHyperparameter(String),

    #[error("Invalid value for hyperparameter '{name}': expected {expected}, found {found}")]
    InvalidHyperparameter {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Operator '{0}' is planned and must be resolved before training")]
    UnresolvedOperator(String),

    #[error("Invalid fairness info: {0}")]
    InvalidFairnessInfo(String),
}

impl ConfigError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingArgument(name.into())
    }

    pub fn invalid(
        name: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidHyperparameter {
            name: name.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Name of the argument this error is about, when there is one.
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::MissingArgument(name)
            | Self::UnknownHyperparameter(name)
            | Self::UnresolvedOperator(name) => Some(name),
            Self::InvalidHyperparameter { name, .. } => Some(name),
            Self::InvalidFairnessInfo(_) => None,
        }
    }
}

/// Top-level error type for operator, data and metric operations.
#[derive(Debug, Error)]
pub enum LaleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Operator '{0}' has not been fitted")]
    NotFitted(String),

    #[error("Operator '{operator}' does not support {method}")]
    Unsupported { operator: String, method: String },

    #[error("Resampler error: {0}")]
    Resampler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] Box<figment::Error>),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl LaleError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn resampler(msg: impl Into<String>) -> Self {
        Self::Resampler(msg.into())
    }

    pub fn unsupported(operator: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Unsupported {
            operator: operator.into(),
            method: method.into(),
        }
    }

    /// The configuration error wrapped by this error, if any.
    pub fn as_config(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}
