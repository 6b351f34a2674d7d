//! Fairness descriptors: favorable labels and protected attributes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lale_core::data::values_equal;
use lale_core::{ConfigError, FeatureRef, Frame, LaleError, Labels, Result};

/// A literal value or an inclusive numeric range `[lo, hi]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupValue {
    Range([f64; 2]),
    Value(Value),
}

impl GroupValue {
    pub fn range(lo: f64, hi: f64) -> Self {
        Self::Range([lo, hi])
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Range([lo, hi]) => value.as_f64().is_some_and(|x| *lo <= x && x <= *hi),
            Self::Value(expected) => values_equal(expected, value),
        }
    }
}

impl From<Value> for GroupValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for GroupValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<i64> for GroupValue {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

fn matches_any(group: &[GroupValue], value: &Value) -> bool {
    group.iter().any(|g| g.matches(value))
}

/// A protected attribute and the values of its privileged (reference) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedAttribute {
    pub feature: FeatureRef,
    pub reference_group: Vec<GroupValue>,
}

impl ProtectedAttribute {
    pub fn new<I, G>(feature: impl Into<FeatureRef>, reference_group: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupValue>,
    {
        Self {
            feature: feature.into(),
            reference_group: reference_group.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_privileged(&self, value: &Value) -> bool {
        matches_any(&self.reference_group, value)
    }

    /// Column of this attribute in `x`, as a configuration error when absent.
    pub fn column(&self, x: &Frame) -> Result<usize> {
        x.column_index(&self.feature).map_err(|_| {
            ConfigError::InvalidFairnessInfo(format!(
                "protected attribute '{}' is not a column of the input",
                self.feature
            ))
            .into()
        })
    }

    /// Output name: the column name for named features, `f<idx>` for positional ones.
    pub fn name(&self) -> String {
        self.feature.display_name()
    }
}

/// Which labels are favorable and which groups are privileged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessInfo {
    pub favorable_labels: Vec<GroupValue>,
    pub protected_attributes: Vec<ProtectedAttribute>,
}

impl FairnessInfo {
    pub fn new<I, G>(favorable_labels: I, protected_attributes: Vec<ProtectedAttribute>) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupValue>,
    {
        Self {
            favorable_labels: favorable_labels.into_iter().map(Into::into).collect(),
            protected_attributes,
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let info: Self = serde_json::from_value(value.clone())?;
        info.validate()?;
        Ok(info)
    }

    /// Structural checks independent of any data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.favorable_labels.is_empty() {
            return Err(ConfigError::InvalidFairnessInfo(
                "favorable_labels must not be empty".into(),
            ));
        }
        if self.protected_attributes.is_empty() {
            return Err(ConfigError::InvalidFairnessInfo(
                "protected_attributes must not be empty".into(),
            ));
        }
        for attr in &self.protected_attributes {
            if attr.reference_group.is_empty() {
                return Err(ConfigError::InvalidFairnessInfo(format!(
                    "reference_group of '{}' must not be empty",
                    attr.feature
                )));
            }
        }
        let ranges = self
            .favorable_labels
            .iter()
            .chain(self.protected_attributes.iter().flat_map(|a| &a.reference_group));
        for group in ranges {
            if let GroupValue::Range([lo, hi]) = group {
                if lo > hi {
                    return Err(ConfigError::InvalidFairnessInfo(format!(
                        "range [{lo}, {hi}] is empty"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check the descriptor against a frame and return the protected column positions.
    pub fn columns(&self, x: &Frame) -> Result<Vec<usize>> {
        self.validate()?;
        self.protected_attributes
            .iter()
            .map(|attr| attr.column(x))
            .collect()
    }

    pub fn is_favorable(&self, label: &Value) -> bool {
        matches_any(&self.favorable_labels, label)
    }

    pub fn favorable_mask(&self, labels: &[Value]) -> Vec<bool> {
        labels.iter().map(|l| self.is_favorable(l)).collect()
    }

    /// Per row: whether every protected attribute lies in its reference group.
    pub fn privileged_mask(&self, x: &Frame) -> Result<Vec<bool>> {
        let columns = self.columns(x)?;
        Ok(x.rows()
            .iter()
            .map(|row| {
                self.protected_attributes
                    .iter()
                    .zip(&columns)
                    .all(|(attr, &col)| attr.is_privileged(&row[col]))
            })
            .collect())
    }

    /// Labels as 0/1, 1 being favorable.
    pub fn encode_labels(&self, labels: &Labels) -> Labels {
        labels
            .iter()
            .map(|l| Value::from(u8::from(self.is_favorable(l))))
            .collect()
    }

    pub(crate) fn check_lengths(x: &Frame, labels: &[Value], what: &str) -> Result<()> {
        if x.row_count() != labels.len() {
            return Err(LaleError::data(format!(
                "{} rows but {} {what}",
                x.row_count(),
                labels.len()
            )));
        }
        Ok(())
    }
}
