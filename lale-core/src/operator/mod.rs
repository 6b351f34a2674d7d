//! Operator lifecycle: trainable operators produce trained ones, and planned
//! operators must be resolved before they can be trained.

pub mod pipeline;

pub use pipeline::{Pipeline, TrainedPipeline};

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::data::{Frame, Labels};
use crate::error::{ConfigError, LaleError, Result};

/// Methods a trained operator may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Transform,
    Predict,
    PredictProba,
    DecisionFunction,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Predict => "predict",
            Self::PredictProba => "predict_proba",
            Self::DecisionFunction => "decision_function",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator whose hyperparameters are fixed and which can be fitted.
pub trait Trainable: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Fit on features `x` and optional labels `y`.
    fn fit(&self, x: &Frame, y: Option<&Labels>) -> Result<Box<dyn Trained>>;
}

/// A fitted operator. Methods the operator does not provide fail with
/// [`LaleError::Unsupported`].
pub trait Trained: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn is_classifier(&self) -> bool {
        false
    }

    fn transform(&self, _x: &Frame) -> Result<Frame> {
        Err(LaleError::unsupported(self.name(), Method::Transform.as_str()))
    }

    fn predict(&self, _x: &Frame) -> Result<Labels> {
        Err(LaleError::unsupported(self.name(), Method::Predict.as_str()))
    }

    fn predict_proba(&self, _x: &Frame) -> Result<Frame> {
        Err(LaleError::unsupported(self.name(), Method::PredictProba.as_str()))
    }

    fn decision_function(&self, _x: &Frame) -> Result<Frame> {
        Err(LaleError::unsupported(
            self.name(),
            Method::DecisionFunction.as_str(),
        ))
    }
}

/// A placeholder for an operator whose hyperparameters are still open.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOperator {
    pub name: String,
    /// Free-form description of the open choices, for the resolver.
    pub spec: Value,
}

impl PlannedOperator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: Value::Null,
        }
    }

    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }
}

/// Turns planned operators into trainable ones, e.g. by hyperparameter search.
pub trait OperatorResolver: Send + Sync {
    fn resolve(&self, planned: &PlannedOperator) -> Result<Arc<dyn Trainable>>;
}

/// A nested operator reference held as a hyperparameter.
#[derive(Debug, Clone)]
pub enum OperatorRef {
    Trainable(Arc<dyn Trainable>),
    Planned(PlannedOperator),
}

impl OperatorRef {
    pub fn trainable<T: Trainable + 'static>(op: T) -> Self {
        Self::Trainable(Arc::new(op))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Trainable(op) => op.name(),
            Self::Planned(planned) => &planned.name,
        }
    }

    pub fn is_planned(&self) -> bool {
        matches!(self, Self::Planned(_))
    }

    /// The trainable operator, or an error if this reference is still planned.
    pub fn as_trainable(&self) -> Result<&Arc<dyn Trainable>, ConfigError> {
        match self {
            Self::Trainable(op) => Ok(op),
            Self::Planned(planned) => Err(ConfigError::UnresolvedOperator(planned.name.clone())),
        }
    }

    /// Resolve a planned reference; trainable references are returned as is.
    pub fn resolve(self, resolver: &dyn OperatorResolver) -> Result<Self> {
        match self {
            Self::Trainable(_) => Ok(self),
            Self::Planned(planned) => {
                tracing::debug!(operator = %planned.name, "Resolving planned operator");
                Ok(Self::Trainable(resolver.resolve(&planned)?))
            }
        }
    }
}

impl From<Arc<dyn Trainable>> for OperatorRef {
    fn from(op: Arc<dyn Trainable>) -> Self {
        Self::Trainable(op)
    }
}

impl From<PlannedOperator> for OperatorRef {
    fn from(planned: PlannedOperator) -> Self {
        Self::Planned(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Identity;

    #[derive(Debug)]
    struct TrainedIdentity;

    impl Trainable for Identity {
        fn name(&self) -> &str {
            "Identity"
        }

        fn fit(&self, _x: &Frame, _y: Option<&Labels>) -> Result<Box<dyn Trained>> {
            Ok(Box::new(TrainedIdentity))
        }
    }

    impl Trained for TrainedIdentity {
        fn name(&self) -> &str {
            "Identity"
        }

        fn transform(&self, x: &Frame) -> Result<Frame> {
            Ok(x.clone())
        }
    }

    struct AlwaysIdentity;

    impl OperatorResolver for AlwaysIdentity {
        fn resolve(&self, _planned: &PlannedOperator) -> Result<Arc<dyn Trainable>> {
            Ok(Arc::new(Identity))
        }
    }

    #[test]
    fn test_unsupported_methods() {
        let trained = Identity.fit(&Frame::default(), None).unwrap();
        let err = trained.predict(&Frame::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operator 'Identity' does not support predict"
        );
        assert!(trained.transform(&Frame::default()).is_ok());
    }

    #[test]
    fn test_planned_reference_needs_resolution() {
        let planned = OperatorRef::from(PlannedOperator::new("LR").with_spec(json!({"C": "?"})));
        assert!(planned.is_planned());
        assert_eq!(
            planned.as_trainable().unwrap_err(),
            ConfigError::UnresolvedOperator("LR".into())
        );

        let resolved = planned.resolve(&AlwaysIdentity).unwrap();
        assert_eq!(resolved.name(), "Identity");
        assert!(resolved.as_trainable().is_ok());
    }
}
