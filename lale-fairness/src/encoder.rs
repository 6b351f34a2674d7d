//! Encode protected attributes (and optionally labels) as 0/1 columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

use lale_core::schema::{HyperparamSchema, HyperparamSpec, Shape};
use lale_core::{ConfigError, Frame, LaleError, Labels, Result, Trainable, Trained};

use crate::info::{FairnessInfo, GroupValue, ProtectedAttribute};

/// How multiple protected attributes are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    #[default]
    KeepSeparate,
    And,
    Or,
    /// Fail when there is more than one protected attribute.
    Error,
}

/// What happens to the non-protected columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remainder {
    #[default]
    Drop,
    Passthrough,
}

static HYPERPARAMS: LazyLock<HyperparamSchema> = LazyLock::new(|| {
    HyperparamSchema::new()
        .with(
            HyperparamSpec::new(
                "favorable_labels",
                "Label values considered favorable; required for transform_labels.",
            )
            .shape(Shape::Any)
            .shape(Shape::null())
            .default_value(Value::Null),
        )
        .with(
            HyperparamSpec::new(
                "protected_attributes",
                "Features and the reference groups considered privileged.",
            )
            .shape(Shape::Any)
            .required(),
        )
        .with(
            HyperparamSpec::new("combine", "How to combine multiple protected attributes.")
                .shape(Shape::literals(["keep_separate", "and", "or", "error"]))
                .default_value(Value::from("keep_separate")),
        )
        .with(
            HyperparamSpec::new("remainder", "Drop or pass through the other columns.")
                .shape(Shape::literals(["drop", "passthrough"]))
                .default_value(Value::from("drop")),
        )
});

#[derive(Deserialize)]
struct EncoderConfig {
    favorable_labels: Option<Vec<GroupValue>>,
    protected_attributes: Vec<ProtectedAttribute>,
    combine: Combine,
    remainder: Remainder,
}

/// Replaces protected attributes by 1 (privileged) or 0 (unprivileged).
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedAttributesEncoder {
    pub protected_attributes: Vec<ProtectedAttribute>,
    pub favorable_labels: Option<Vec<GroupValue>>,
    pub combine: Combine,
    pub remainder: Remainder,
}

impl ProtectedAttributesEncoder {
    pub fn new(info: &FairnessInfo) -> Self {
        Self {
            protected_attributes: info.protected_attributes.clone(),
            favorable_labels: Some(info.favorable_labels.clone()),
            combine: Combine::default(),
            remainder: Remainder::default(),
        }
    }

    pub fn from_attributes(protected_attributes: Vec<ProtectedAttribute>) -> Self {
        Self {
            protected_attributes,
            favorable_labels: None,
            combine: Combine::default(),
            remainder: Remainder::default(),
        }
    }

    /// Build from a JSON object validated against the encoder's hyperparameter schema.
    pub fn from_config(config: &Map<String, Value>) -> Result<Self> {
        let validated = HYPERPARAMS.validate_json(config)?;
        let parsed: EncoderConfig = serde_json::from_value(validated.to_json())?;
        Ok(Self {
            protected_attributes: parsed.protected_attributes,
            favorable_labels: parsed.favorable_labels,
            combine: parsed.combine,
            remainder: parsed.remainder,
        })
    }

    pub fn hyperparam_schema() -> &'static HyperparamSchema {
        &HYPERPARAMS
    }

    pub fn combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }

    pub fn remainder(mut self, remainder: Remainder) -> Self {
        self.remainder = remainder;
        self
    }

    /// Encode the protected columns of `x`.
    pub fn transform(&self, x: &Frame) -> Result<Frame> {
        if self.combine == Combine::Error && self.protected_attributes.len() > 1 {
            return Err(ConfigError::InvalidFairnessInfo(format!(
                "combine='error' with {} protected attributes",
                self.protected_attributes.len()
            ))
            .into());
        }

        let mut encoded = Vec::with_capacity(self.protected_attributes.len());
        for attr in &self.protected_attributes {
            let col = attr.column(x)?;
            let values: Vec<bool> = x
                .column_values(col)
                .map(|v| attr.is_privileged(v))
                .collect();
            encoded.push((col, attr.name(), values));
        }

        let combined = match self.combine {
            Combine::KeepSeparate | Combine::Error => None,
            Combine::And | Combine::Or => {
                let joiner = if self.combine == Combine::And { "_and_" } else { "_or_" };
                let name = encoded
                    .iter()
                    .map(|(_, name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(joiner);
                let values = (0..x.row_count())
                    .map(|i| {
                        let mut bits = encoded.iter().map(|(_, _, v)| v[i]);
                        if self.combine == Combine::And {
                            bits.all(|b| b)
                        } else {
                            bits.any(|b| b)
                        }
                    })
                    .collect::<Vec<_>>();
                Some((name, values))
            }
        };

        let as_cells = |bits: Vec<bool>| -> Vec<Value> {
            bits.into_iter().map(|b| Value::from(u8::from(b))).collect()
        };
        match (self.remainder, combined) {
            (Remainder::Drop, None) => Frame::from_columns(
                encoded
                    .into_iter()
                    .map(|(_, name, bits)| (name, as_cells(bits)))
                    .collect(),
            ),
            (Remainder::Drop, Some((name, bits))) => {
                Frame::from_columns(vec![(name, as_cells(bits))])
            }
            (Remainder::Passthrough, None) => {
                let mut out = x.clone();
                for (col, _, bits) in encoded {
                    out.set_column(col, as_cells(bits))?;
                }
                Ok(out)
            }
            (Remainder::Passthrough, Some((name, bits))) => {
                let protected: Vec<usize> = encoded.iter().map(|(col, _, _)| *col).collect();
                let mut out = x.drop_columns(&protected);
                out.push_column(name, as_cells(bits))?;
                Ok(out)
            }
        }
    }

    /// Labels as 0/1, 1 being favorable.
    pub fn transform_labels(&self, y: &Labels) -> Result<Labels> {
        let favorable = self.favorable_labels.as_ref().ok_or_else(|| {
            LaleError::from(ConfigError::missing("favorable_labels"))
        })?;
        Ok(y.iter()
            .map(|label| Value::from(u8::from(favorable.iter().any(|g| g.matches(label)))))
            .collect())
    }
}

impl Trainable for ProtectedAttributesEncoder {
    fn name(&self) -> &str {
        "ProtectedAttributesEncoder"
    }

    fn fit(&self, x: &Frame, _y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        for attr in &self.protected_attributes {
            attr.column(x)?;
        }
        Ok(Box::new(TrainedEncoder(self.clone())))
    }
}

#[derive(Debug)]
struct TrainedEncoder(ProtectedAttributesEncoder);

impl Trained for TrainedEncoder {
    fn name(&self) -> &str {
        "ProtectedAttributesEncoder"
    }

    fn transform(&self, x: &Frame) -> Result<Frame> {
        self.0.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn column(frame: &Frame) -> Vec<Value> {
        frame.column_values(0).cloned().collect()
    }

    fn sample() -> (Frame, FairnessInfo) {
        let x = Frame::new(
            vec!["personal_status".into(), "age".into(), "amount".into()],
            vec![
                vec![json!("male single"), json!(30), json!(1000)],
                vec![json!("female div/dep/mar"), json!(40), json!(2000)],
                vec![json!("male mar/wid"), json!(22), json!(500)],
            ],
        )
        .unwrap();
        let info = FairnessInfo::new(
            ["good"],
            vec![
                ProtectedAttribute::new("personal_status", ["male single", "male mar/wid"]),
                ProtectedAttribute::new("age", [GroupValue::range(26.0, 1000.0)]),
            ],
        );
        (x, info)
    }

    #[test]
    fn test_keep_separate_drop() {
        let (x, info) = sample();
        let out = ProtectedAttributesEncoder::new(&info).transform(&x).unwrap();
        assert_eq!(out.columns(), &["personal_status".to_string(), "age".to_string()]);
        assert_eq!(out.row(0).unwrap(), &[json!(1), json!(1)]);
        assert_eq!(out.row(1).unwrap(), &[json!(0), json!(1)]);
        assert_eq!(out.row(2).unwrap(), &[json!(1), json!(0)]);
    }

    #[test]
    fn test_and_or() {
        let (x, info) = sample();
        let and = ProtectedAttributesEncoder::new(&info)
            .combine(Combine::And)
            .transform(&x)
            .unwrap();
        assert_eq!(and.columns(), &["personal_status_and_age".to_string()]);
        assert_eq!(column(&and), vec![json!(1), json!(0), json!(0)]);

        let or = ProtectedAttributesEncoder::new(&info)
            .combine(Combine::Or)
            .transform(&x)
            .unwrap();
        assert_eq!(column(&or), vec![json!(1), json!(1), json!(1)]);
    }

    #[test]
    fn test_passthrough() {
        let (x, info) = sample();
        let out = ProtectedAttributesEncoder::new(&info)
            .remainder(Remainder::Passthrough)
            .transform(&x)
            .unwrap();
        assert_eq!(out.columns(), x.columns());
        assert_eq!(out.row(1).unwrap(), &[json!(0), json!(1), json!(2000)]);

        let combined = ProtectedAttributesEncoder::new(&info)
            .remainder(Remainder::Passthrough)
            .combine(Combine::And)
            .transform(&x)
            .unwrap();
        assert_eq!(
            combined.columns(),
            &["amount".to_string(), "personal_status_and_age".to_string()]
        );
    }

    #[test]
    fn test_combine_error() {
        let (x, info) = sample();
        let err = ProtectedAttributesEncoder::new(&info)
            .combine(Combine::Error)
            .transform(&x)
            .unwrap_err();
        assert!(matches!(err.as_config(), Some(ConfigError::InvalidFairnessInfo(_))));
    }

    #[test]
    fn test_positional_names() {
        let x = Frame::from_rows(vec![
            vec![json!("a"), json!(3)],
            vec![json!("b"), json!(30)],
        ])
        .unwrap();
        let encoder = ProtectedAttributesEncoder::from_attributes(vec![ProtectedAttribute::new(
            1usize,
            [GroupValue::range(26.0, 1000.0)],
        )]);
        let out = encoder.transform(&x).unwrap();
        assert_eq!(out.columns(), &["f1".to_string()]);
        assert_eq!(column(&out), vec![json!(0), json!(1)]);
        assert!(encoder.transform_labels(&vec![json!(1)]).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = json!({
            "favorable_labels": ["good"],
            "protected_attributes": [{"feature": "age", "reference_group": [[26, 1000]]}],
            "combine": "or",
        });
        let encoder = ProtectedAttributesEncoder::from_config(config.as_object().unwrap()).unwrap();
        assert_eq!(encoder.combine, Combine::Or);
        assert_eq!(encoder.remainder, Remainder::Drop);
        assert_eq!(
            encoder.transform_labels(&vec![json!("good"), json!("bad")]).unwrap(),
            vec![json!(1), json!(0)]
        );

        let bad = json!({"protected_attributes": [], "combine": "xor"});
        assert!(ProtectedAttributesEncoder::from_config(bad.as_object().unwrap()).is_err());
    }
}
