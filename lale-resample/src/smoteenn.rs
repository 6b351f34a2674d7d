//! Combined over- and under-sampling: SMOTE followed by Edited Nearest
//! Neighbours cleaning.
//!
//! Construction happens in two phases. [`SmoteEnnBuilder`] collects
//! hyperparameters and the nested operator but cannot be fitted; `build`
//! validates them against the operator schema and asks a [`SmoteEnnBackend`]
//! for the resampler, producing a trainable [`SmoteEnn`].

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex};

use lale_core::schema::{
    Callable, CellShape, Component, DataShape, DataStage, HyperparamSchema, HyperparamSpec,
    Hyperparams, OperatorDescriptor, ParamValue, Shape, Tags,
};
use lale_core::{
    ConfigError, Frame, LaleError, Labels, OperatorRef, OperatorResolver, Result, Trainable,
    Trained,
};

use crate::resampler::{Resampler, ResamplerOperator, TrainedResampler};

const NAME: &str = "SMOTEENN";

/// Type tag of random generator components accepted by `random_state`.
pub const RNG_TAG: &str = "rng";

/// Callable form of `sampling_strategy`: maps the labels to per-class target counts.
pub type TargetCountsFn = Arc<dyn Fn(&[Value]) -> BTreeMap<String, usize> + Send + Sync>;

/// Classes targeted by a named sampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClasses {
    Minority,
    NotMinority,
    NotMajority,
    All,
    /// Same as `NotMajority`.
    Auto,
}

impl TargetClasses {
    pub const ALL: [TargetClasses; 5] = [
        Self::Minority,
        Self::NotMinority,
        Self::NotMajority,
        Self::All,
        Self::Auto,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minority => "minority",
            Self::NotMinority => "not minority",
            Self::NotMajority => "not majority",
            Self::All => "all",
            Self::Auto => "auto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Typed `sampling_strategy`.
#[derive(Debug, Clone)]
pub enum SamplingStrategy {
    /// Desired minority/majority ratio after resampling (binary problems only).
    Ratio(f64),
    Target(TargetClasses),
    /// Desired number of samples per targeted class.
    Counts(BTreeMap<String, usize>),
    Callable(Callable),
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Target(TargetClasses::Auto)
    }
}

impl SamplingStrategy {
    /// Per-class target counts for the count and callable forms.
    pub fn counts(&self, y: &[Value]) -> Result<Option<BTreeMap<String, usize>>> {
        match self {
            Self::Counts(counts) => Ok(Some(counts.clone())),
            Self::Callable(callable) => {
                let f = callable.downcast_ref::<TargetCountsFn>().ok_or_else(|| {
                    LaleError::resampler(format!(
                        "callable '{}' is not a target-count function",
                        callable.name()
                    ))
                })?;
                Ok(Some(f(y)))
            }
            Self::Ratio(_) | Self::Target(_) => Ok(None),
        }
    }

    fn from_param(value: &ParamValue) -> Result<Self, ConfigError> {
        let invalid = |expected: &str| {
            ConfigError::invalid("sampling_strategy", expected, value.describe())
        };
        match value {
            ParamValue::Json(Value::Number(n)) => n
                .as_f64()
                .map(Self::Ratio)
                .ok_or_else(|| invalid("number")),
            ParamValue::Json(Value::String(s)) => TargetClasses::parse(s)
                .map(Self::Target)
                .ok_or_else(|| invalid("a named strategy")),
            ParamValue::Json(Value::Object(map)) => map
                .iter()
                .map(|(class, count)| {
                    count
                        .as_u64()
                        .and_then(|c| usize::try_from(c).ok())
                        .map(|c| (class.clone(), c))
                        .ok_or_else(|| invalid("object of non-negative integer counts"))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Self::Counts),
            ParamValue::Callable(callable) => Ok(Self::Callable(callable.clone())),
            _ => Err(invalid("number | string | object | callable")),
        }
    }
}

/// Typed `random_state`.
#[derive(Debug, Clone, Default)]
pub enum RandomState {
    #[default]
    Unset,
    Seed(u64),
    Generator(Component),
}

impl RandomState {
    /// A shareable random generator component for `random_state`.
    pub fn generator(seed: u64) -> Component {
        Component::new(RNG_TAG, Mutex::new(StdRng::seed_from_u64(seed)))
    }

    /// A generator for one resampling run. Shared generators advance on each call.
    pub fn rng(&self) -> Result<StdRng> {
        match self {
            Self::Unset => Ok(StdRng::from_entropy()),
            Self::Seed(seed) => Ok(StdRng::seed_from_u64(*seed)),
            Self::Generator(component) => {
                let shared = component.downcast_ref::<Mutex<StdRng>>().ok_or_else(|| {
                    LaleError::resampler("random_state component is not a StdRng generator")
                })?;
                let mut guard = shared
                    .lock()
                    .map_err(|_| LaleError::resampler("random generator lock poisoned"))?;
                StdRng::from_rng(&mut *guard).map_err(|e| LaleError::resampler(e.to_string()))
            }
        }
    }

    fn from_param(value: &ParamValue) -> Result<Self, ConfigError> {
        match value {
            ParamValue::Json(Value::Null) => Ok(Self::Unset),
            ParamValue::Json(Value::Number(n)) => n.as_u64().map(Self::Seed).ok_or_else(|| {
                ConfigError::invalid("random_state", "integer >= 0", value.describe())
            }),
            ParamValue::Component(c) => Ok(Self::Generator(c.clone())),
            _ => Err(ConfigError::invalid(
                "random_state",
                "null | integer | component<rng>",
                value.describe(),
            )),
        }
    }
}

/// Validated SMOTEENN hyperparameters, passed verbatim to the backend.
#[derive(Debug, Clone, Default)]
pub struct SmoteEnnParams {
    pub sampling_strategy: SamplingStrategy,
    pub random_state: RandomState,
    /// Pre-configured SMOTE instance; the backend's default when absent.
    pub smote: Option<ParamValue>,
    /// Pre-configured ENN instance; the backend's default when absent.
    pub enn: Option<ParamValue>,
}

impl TryFrom<&Hyperparams> for SmoteEnnParams {
    type Error = ConfigError;

    fn try_from(params: &Hyperparams) -> Result<Self, ConfigError> {
        let sub_algorithm = |name: &str| params.get(name).filter(|v| !v.is_null()).cloned();
        Ok(Self {
            sampling_strategy: params
                .get("sampling_strategy")
                .map(SamplingStrategy::from_param)
                .transpose()?
                .unwrap_or_default(),
            random_state: params
                .get("random_state")
                .map(RandomState::from_param)
                .transpose()?
                .unwrap_or_default(),
            smote: sub_algorithm("smote"),
            enn: sub_algorithm("enn"),
        })
    }
}

/// Instantiates the external combined resampler.
pub trait SmoteEnnBackend: Send + Sync {
    fn instantiate(&self, params: &SmoteEnnParams) -> Result<Arc<dyn Resampler>>;
}

static DESCRIPTOR: LazyLock<OperatorDescriptor> = LazyLock::new(descriptor);

fn descriptor() -> OperatorDescriptor {
    let hyperparams = HyperparamSchema::new()
        .with(
            HyperparamSpec::new(
                "operator",
                "Trainable pipeline fitted on the resampled data. Predict, transform, \
                 predict_proba and decision_function are forwarded to it. A planned \
                 operator must be resolved to a trainable one first.",
            )
            .shape(Shape::Operator)
            .required()
            .relevant_to_optimizer(),
        )
        .with(
            HyperparamSpec::new(
                "sampling_strategy",
                "Sampling information to resample the data set.",
            )
            .documented_shape(
                Shape::number().with_exclusive_minimum(0.0).with_maximum(1.0),
                "Desired ratio of minority to majority samples after resampling. \
                 Binary classification only.",
            )
            .documented_shape(
                Shape::literals(TargetClasses::ALL.map(TargetClasses::as_str)),
                "Classes targeted by the resampling; 'auto' means 'not majority'.",
            )
            .documented_shape(
                Shape::Record,
                "Desired number of samples for each targeted class.",
            )
            .documented_shape(
                Shape::Callable,
                "Function of the labels returning the desired number of samples per class.",
            )
            .default_value(Value::from("auto")),
        )
        .with(
            HyperparamSpec::new("random_state", "Control the randomization of the algorithm.")
                .documented_shape(Shape::null(), "Fresh entropy on every run.")
                .documented_shape(
                    Shape::integer().with_minimum(0.0),
                    "The seed used by the random number generator.",
                )
                .documented_shape(Shape::component(RNG_TAG), "Random number generator instance.")
                .default_value(Value::Null),
        )
        .with(
            HyperparamSpec::new(
                "smote",
                "The SMOTE object to use. A default SMOTE is used when not given.",
            )
            .shape(Shape::Any)
            .shape(Shape::null())
            .default_value(Value::Null),
        )
        .with(
            HyperparamSpec::new(
                "enn",
                "The EditedNearestNeighbours object to use. One with sampling strategy \
                 'all' is used when not given.",
            )
            .shape(Shape::Any)
            .shape(Shape::null())
            .default_value(Value::Null),
        );

    let features = |labels| DataShape::Features {
        cells: CellShape::Number,
        labels,
    };
    OperatorDescriptor::new(
        NAME,
        "Combine over- and under-sampling using SMOTE and Edited Nearest Neighbours.",
    )
    .documentation_url(
        "https://lale.readthedocs.io/en/latest/modules/lale.lib.imblearn.smoteenn.html",
    )
    .tags(Tags::op(["transformer", "estimator", "resampler"]))
    .hyperparams(hyperparams)
    .data(DataStage::InputFit, features(Some(CellShape::Label)))
    .data(DataStage::InputTransform, features(None))
    .data(DataStage::OutputTransform, DataShape::Matrix(CellShape::Number))
    .data(DataStage::InputPredict, features(None))
    .data(DataStage::OutputPredict, DataShape::Labels(CellShape::Label))
    .data(DataStage::InputPredictProba, features(None))
    .data(DataStage::OutputPredictProba, DataShape::Matrix(CellShape::Number))
    .data(DataStage::InputDecisionFunction, features(None))
    .data(DataStage::OutputDecisionFunction, DataShape::Matrix(CellShape::Number))
}

/// Planned SMOTEENN: hyperparameters and nested operator, not yet validated.
#[derive(Debug, Clone, Default)]
pub struct SmoteEnnBuilder {
    values: BTreeMap<String, ParamValue>,
}

impl SmoteEnnBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw map of hyperparameters, e.g. produced by a planner.
    pub fn from_hyperparams(values: BTreeMap<String, ParamValue>) -> Self {
        Self { values }
    }

    pub fn operator(self, operator: impl Into<OperatorRef>) -> Self {
        self.set("operator", ParamValue::Operator(operator.into()))
    }

    pub fn sampling_strategy(self, value: impl Into<ParamValue>) -> Self {
        self.set("sampling_strategy", value)
    }

    pub fn random_state(self, value: impl Into<ParamValue>) -> Self {
        self.set("random_state", value)
    }

    pub fn smote(self, value: impl Into<ParamValue>) -> Self {
        self.set("smote", value)
    }

    pub fn enn(self, value: impl Into<ParamValue>) -> Self {
        self.set("enn", value)
    }

    /// Set any hyperparameter by name. Unknown names fail at `build`.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn is_planned(&self) -> bool {
        matches!(self.values.get("operator"), Some(ParamValue::Operator(op)) if op.is_planned())
    }

    /// Resolve a planned nested operator through an external resolver.
    pub fn resolve(mut self, resolver: &dyn OperatorResolver) -> Result<Self> {
        if let Some(ParamValue::Operator(op)) = self.values.remove("operator") {
            let resolved = op.resolve(resolver)?;
            self.values
                .insert("operator".into(), ParamValue::Operator(resolved));
        }
        Ok(self)
    }

    /// Validate without instantiating the resampler.
    pub fn validate(&self) -> Result<Hyperparams, ConfigError> {
        DESCRIPTOR.hyperparams.validate(self.values.clone())
    }

    /// Validate, instantiate the resampler and produce the trainable operator.
    pub fn build(self, backend: &dyn SmoteEnnBackend) -> Result<SmoteEnn> {
        let hyperparams = DESCRIPTOR.hyperparams.validate(self.values)?;
        let operator = match hyperparams.get("operator") {
            Some(ParamValue::Operator(op)) => Arc::clone(op.as_trainable()?),
            _ => return Err(ConfigError::missing("operator").into()),
        };
        let params = SmoteEnnParams::try_from(&hyperparams)?;
        let resampler = backend.instantiate(&params)?;
        tracing::debug!(
            operator = operator.name(),
            resampler = resampler.name(),
            hyperparams = %hyperparams.to_json(),
            "Built SMOTEENN"
        );
        Ok(SmoteEnn {
            inner: ResamplerOperator::new(NAME, operator, resampler),
            hyperparams,
            params,
        })
    }
}

/// Trainable SMOTEENN with a validated configuration and a resolved nested operator.
#[derive(Clone)]
pub struct SmoteEnn {
    inner: ResamplerOperator,
    hyperparams: Hyperparams,
    params: SmoteEnnParams,
}

impl SmoteEnn {
    pub fn builder() -> SmoteEnnBuilder {
        SmoteEnnBuilder::new()
    }

    pub fn descriptor() -> &'static OperatorDescriptor {
        &DESCRIPTOR
    }

    pub fn hyperparams(&self) -> &Hyperparams {
        &self.hyperparams
    }

    pub fn params(&self) -> &SmoteEnnParams {
        &self.params
    }

    pub fn operator(&self) -> &Arc<dyn Trainable> {
        self.inner.operator()
    }

    /// Fit and keep the concrete trained type, with its resampling summary.
    pub fn fit_resampled(&self, x: &Frame, y: Option<&Labels>) -> Result<TrainedResampler> {
        DESCRIPTOR.check_input(DataStage::InputFit, x, y)?;
        self.inner.fit_resampled(x, y)
    }
}

impl fmt::Debug for SmoteEnn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmoteEnn")
            .field("operator", &self.inner.operator().name())
            .field("resampler", &self.inner.resampler().name())
            .field("hyperparams", &self.hyperparams.to_json())
            .finish()
    }
}

impl Trainable for SmoteEnn {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&self, x: &Frame, y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        Ok(Box::new(self.fit_resampled(x, y)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Passthrough;

    impl Resampler for Passthrough {
        fn name(&self) -> &str {
            "Passthrough"
        }

        fn fit_resample(&self, x: &Frame, y: &Labels) -> Result<(Frame, Labels)> {
            Ok((x.clone(), y.clone()))
        }
    }

    struct PassthroughBackend;

    impl SmoteEnnBackend for PassthroughBackend {
        fn instantiate(&self, _params: &SmoteEnnParams) -> Result<Arc<dyn Resampler>> {
            Ok(Arc::new(Passthrough))
        }
    }

    #[derive(Debug)]
    struct Constant;

    impl Trainable for Constant {
        fn name(&self) -> &str {
            "Constant"
        }

        fn fit(&self, _x: &Frame, _y: Option<&Labels>) -> Result<Box<dyn Trained>> {
            Err(LaleError::data("not used"))
        }
    }

    #[test]
    fn test_target_classes_parse() {
        assert_eq!(TargetClasses::parse("not majority"), Some(TargetClasses::NotMajority));
        assert_eq!(TargetClasses::parse("majority"), None);
    }

    #[test]
    fn test_defaults() {
        let op = SmoteEnn::builder()
            .operator(OperatorRef::trainable(Constant))
            .build(&PassthroughBackend)
            .unwrap();
        assert!(matches!(
            op.params().sampling_strategy,
            SamplingStrategy::Target(TargetClasses::Auto)
        ));
        assert!(matches!(op.params().random_state, RandomState::Unset));
        assert!(op.params().smote.is_none());
        assert_eq!(op.hyperparams().len(), 5);
    }

    #[test]
    fn test_counts_strategy() {
        let op = SmoteEnn::builder()
            .operator(OperatorRef::trainable(Constant))
            .sampling_strategy(json!({"bad": 300, "good": 700}))
            .random_state(json!(42))
            .build(&PassthroughBackend)
            .unwrap();
        let counts = op.params().sampling_strategy.counts(&[]).unwrap().unwrap();
        assert_eq!(counts["bad"], 300);
        assert!(matches!(op.params().random_state, RandomState::Seed(42)));
    }

    #[test]
    fn test_negative_counts_rejected() {
        let err = SmoteEnn::builder()
            .operator(OperatorRef::trainable(Constant))
            .sampling_strategy(json!({"bad": -1}))
            .build(&PassthroughBackend)
            .unwrap_err();
        assert_eq!(err.as_config().and_then(ConfigError::argument), Some("sampling_strategy"));
    }

    #[test]
    fn test_callable_strategy() {
        let f: TargetCountsFn = Arc::new(|y: &[Value]| {
            let mut counts = BTreeMap::new();
            counts.insert("1".to_string(), y.len());
            counts
        });
        let op = SmoteEnn::builder()
            .operator(OperatorRef::trainable(Constant))
            .sampling_strategy(Callable::new("all_rows", f))
            .build(&PassthroughBackend)
            .unwrap();
        let counts = op
            .params()
            .sampling_strategy
            .counts(&[json!(0), json!(1), json!(1)])
            .unwrap()
            .unwrap();
        assert_eq!(counts["1"], 3);
    }

    #[test]
    fn test_seeded_generators_agree() {
        use rand::Rng;
        let a = RandomState::Generator(RandomState::generator(7)).rng().unwrap().r#gen::<u64>();
        let b = RandomState::Generator(RandomState::generator(7)).rng().unwrap().r#gen::<u64>();
        assert_eq!(a, b);

        let shared = RandomState::Generator(RandomState::generator(7));
        let first = shared.rng().unwrap().r#gen::<u64>();
        let second = shared.rng().unwrap().r#gen::<u64>();
        assert_ne!(first, second);
    }

    #[test]
    fn test_descriptor_document() {
        let doc = SmoteEnn::descriptor().to_json_schema();
        assert_eq!(doc["tags"]["op"], json!(["transformer", "estimator", "resampler"]));
        let hp = &doc["properties"]["hyperparams"]["allOf"][0];
        assert_eq!(hp["required"], json!(["operator"]));
        assert_eq!(hp["relevantToOptimizer"], json!(["operator"]));
        assert_eq!(hp["properties"]["sampling_strategy"]["default"], json!("auto"));
        assert_eq!(
            hp["properties"]["random_state"]["anyOf"][2]["laleType"],
            json!("rng")
        );
        assert!(doc["properties"]["output_decision_function"].is_object());
    }
}
