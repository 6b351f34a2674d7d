//! End-to-end behaviour of the SMOTEENN adapter with a stand-in resampler.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use lale_core::data::{class_counts, label_key};
use lale_core::schema::ParamValue;
use lale_core::{
    ConfigError, Frame, LaleError, Labels, OperatorRef, OperatorResolver, PlannedOperator,
    Result, Trainable, Trained,
};
use lale_resample::{
    RandomState, Resampler, SamplingStrategy, SmoteEnn, SmoteEnnBackend, SmoteEnnParams,
};
use pretty_assertions::assert_eq;
use rand::seq::SliceRandom;
use serde_json::{Value, json};

/// Oversamples every minority class to the majority count by drawing rows with
/// replacement, using the configured random state.
#[derive(Debug)]
struct RandomOversampler {
    random_state: RandomState,
}

impl Resampler for RandomOversampler {
    fn name(&self) -> &str {
        "RandomOversampler"
    }

    fn fit_resample(&self, x: &Frame, y: &Labels) -> Result<(Frame, Labels)> {
        let mut rng = self.random_state.rng()?;
        let counts = class_counts(y);
        let majority = counts.values().copied().max().unwrap_or(0);
        let mut indices: Vec<usize> = (0..y.len()).collect();
        for (class, count) in &counts {
            let members: Vec<usize> = (0..y.len())
                .filter(|&i| label_key(&y[i]) == *class)
                .collect();
            for _ in *count..majority {
                if let Some(&i) = members.choose(&mut rng) {
                    indices.push(i);
                }
            }
        }
        let y_res = indices.iter().map(|&i| y[i].clone()).collect();
        Ok((x.select_rows(&indices)?, y_res))
    }
}

/// Records the parameters it was asked to instantiate.
#[derive(Default)]
struct RecordingBackend {
    seen: Mutex<Vec<String>>,
}

impl SmoteEnnBackend for RecordingBackend {
    fn instantiate(&self, params: &SmoteEnnParams) -> Result<Arc<dyn Resampler>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(format!("{:?}", params.sampling_strategy));
        }
        Ok(Arc::new(RandomOversampler {
            random_state: params.random_state.clone(),
        }))
    }
}

/// Predicts the majority label seen at fit time and remembers the training size.
#[derive(Debug)]
struct MajorityClassifier;

#[derive(Debug)]
struct TrainedMajority {
    label: Value,
    rows_seen: usize,
}

impl Trainable for MajorityClassifier {
    fn name(&self) -> &str {
        "MajorityClassifier"
    }

    fn fit(&self, x: &Frame, y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        let y = y.ok_or_else(|| LaleError::data("labels required"))?;
        let counts = class_counts(y);
        let label = y
            .iter()
            .max_by_key(|v| counts.get(&label_key(v)).copied().unwrap_or(0))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(Box::new(TrainedMajority {
            label,
            rows_seen: x.row_count(),
        }))
    }
}

impl Trained for TrainedMajority {
    fn name(&self) -> &str {
        "MajorityClassifier"
    }

    fn is_classifier(&self) -> bool {
        true
    }

    fn predict(&self, x: &Frame) -> Result<Labels> {
        Ok(vec![self.label.clone(); x.row_count()])
    }

    fn predict_proba(&self, x: &Frame) -> Result<Frame> {
        let rows = vec![vec![json!(1.0)]; x.row_count()];
        Frame::new(vec![label_key(&self.label)], rows)
    }
}

struct ResolveToMajority;

impl OperatorResolver for ResolveToMajority {
    fn resolve(&self, planned: &PlannedOperator) -> Result<Arc<dyn Trainable>> {
        if planned.name == "MajorityClassifier" {
            Ok(Arc::new(MajorityClassifier))
        } else {
            Err(ConfigError::UnresolvedOperator(planned.name.clone()).into())
        }
    }
}

fn imbalanced() -> (Frame, Labels) {
    let rows: Vec<Vec<Value>> = (0..10).map(|i| vec![json!(i as f64), json!(1.0)]).collect();
    let mut y = vec![json!("good"); 8];
    y.extend([json!("bad"), json!("bad")]);
    (Frame::from_rows(rows).unwrap(), y)
}

#[test]
fn missing_operator_is_a_configuration_error() {
    let err = SmoteEnn::builder()
        .random_state(json!(42))
        .build(&RecordingBackend::default())
        .unwrap_err();
    assert_eq!(
        err.as_config(),
        Some(&ConfigError::MissingArgument("operator".into()))
    );
}

#[test]
fn invalid_sampling_strategy_names_the_key() {
    for bad in [json!(true), json!("sometimes"), json!(1.5), json!(0.0)] {
        let err = SmoteEnn::builder()
            .operator(OperatorRef::trainable(MajorityClassifier))
            .sampling_strategy(bad.clone())
            .build(&RecordingBackend::default())
            .unwrap_err();
        let config = err.as_config().unwrap();
        assert_eq!(config.argument(), Some("sampling_strategy"), "value {bad}");
        assert!(err.to_string().contains("sampling_strategy"));
    }
}

#[test]
fn invalid_random_state_and_unknown_keys() {
    let err = SmoteEnn::builder()
        .operator(OperatorRef::trainable(MajorityClassifier))
        .random_state(json!(-1))
        .build(&RecordingBackend::default())
        .unwrap_err();
    assert_eq!(err.as_config().and_then(ConfigError::argument), Some("random_state"));

    let err = SmoteEnn::builder()
        .operator(OperatorRef::trainable(MajorityClassifier))
        .set("k_neighbors", json!(5))
        .build(&RecordingBackend::default())
        .unwrap_err();
    assert_eq!(
        err.as_config(),
        Some(&ConfigError::UnknownHyperparameter("k_neighbors".into()))
    );
}

#[test]
fn hyperparameters_reach_the_backend() {
    let backend = RecordingBackend::default();
    let op = SmoteEnn::builder()
        .operator(OperatorRef::trainable(MajorityClassifier))
        .sampling_strategy(json!("minority"))
        .random_state(json!(3))
        .build(&backend)
        .unwrap();
    assert!(matches!(op.params().random_state, RandomState::Seed(3)));
    let seen = backend.seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &["Target(Minority)".to_string()]);
    assert!(matches!(
        op.params().sampling_strategy,
        SamplingStrategy::Target(_)
    ));
}

#[test]
fn nested_operator_is_fitted_on_resampled_data() {
    let (x, y) = imbalanced();
    let op = SmoteEnn::builder()
        .operator(OperatorRef::trainable(MajorityClassifier))
        .random_state(json!(0))
        .build(&RecordingBackend::default())
        .unwrap();

    let trained = op.fit_resampled(&x, Some(&y)).unwrap();
    assert_eq!(trained.summary().rows_before(), 10);
    assert_eq!(trained.summary().rows_after(), 16);
    assert_eq!(trained.summary().after["bad"], 8);

    let nested = format!("{:?}", trained.operator());
    assert!(nested.contains("rows_seen: 16"));
}

#[test]
fn predictions_cover_every_input_row() {
    let (x, y) = imbalanced();
    let op = SmoteEnn::builder()
        .operator(OperatorRef::trainable(MajorityClassifier))
        .build(&RecordingBackend::default())
        .unwrap();
    let trained = op.fit(&x, Some(&y)).unwrap();

    assert!(trained.is_classifier());
    assert_eq!(trained.predict(&x).unwrap().len(), x.row_count());
    assert_eq!(trained.predict_proba(&x).unwrap().row_count(), x.row_count());
    assert!(matches!(
        trained.decision_function(&x),
        Err(LaleError::Unsupported { .. })
    ));
}

#[test]
fn string_features_are_rejected_at_fit() {
    let x = Frame::from_rows(vec![vec![json!("a")], vec![json!("b")]]).unwrap();
    let y = vec![json!(0), json!(1)];
    let op = SmoteEnn::builder()
        .operator(OperatorRef::trainable(MajorityClassifier))
        .build(&RecordingBackend::default())
        .unwrap();
    let err = op.fit(&x, Some(&y)).unwrap_err();
    assert!(matches!(err, LaleError::Data(_)));
}

#[test]
fn planned_operator_must_be_resolved() {
    let planned = OperatorRef::from(PlannedOperator::new("MajorityClassifier"));
    let builder = SmoteEnn::builder().operator(planned);
    assert!(builder.is_planned());
    assert!(builder.validate().is_ok());

    let err = builder
        .clone()
        .build(&RecordingBackend::default())
        .unwrap_err();
    assert_eq!(
        err.as_config(),
        Some(&ConfigError::UnresolvedOperator("MajorityClassifier".into()))
    );

    let resolved = builder.resolve(&ResolveToMajority).unwrap();
    assert!(!resolved.is_planned());
    let op = resolved.build(&RecordingBackend::default()).unwrap();
    assert_eq!(op.operator().name(), "MajorityClassifier");
}

#[test]
fn builds_from_a_hyperparameter_map() {
    let mut values = BTreeMap::new();
    values.insert(
        "operator".to_string(),
        ParamValue::from(OperatorRef::trainable(MajorityClassifier)),
    );
    values.insert("sampling_strategy".to_string(), ParamValue::from(json!(0.5)));
    values.insert(
        "random_state".to_string(),
        ParamValue::from(RandomState::generator(11)),
    );
    let op = lale_resample::SmoteEnnBuilder::from_hyperparams(values)
        .build(&RecordingBackend::default())
        .unwrap();
    assert!(matches!(
        op.params().sampling_strategy,
        SamplingStrategy::Ratio(r) if (r - 0.5).abs() < f64::EPSILON
    ));
    assert!(matches!(op.params().random_state, RandomState::Generator(_)));
}
