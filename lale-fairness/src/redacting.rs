//! Redaction of protected attributes: each protected column is overwritten
//! with its most frequent training value.

use serde_json::Value;
use std::collections::HashMap;

use lale_core::data::label_key;
use lale_core::{FeatureRef, Frame, LaleError, Labels, Result, Trainable, Trained};

use crate::info::{FairnessInfo, ProtectedAttribute};

#[derive(Debug, Clone, PartialEq)]
pub struct Redacting {
    protected_attributes: Vec<ProtectedAttribute>,
}

impl Redacting {
    pub fn new(info: &FairnessInfo) -> Self {
        Self {
            protected_attributes: info.protected_attributes.clone(),
        }
    }

    pub fn fit_redacting(&self, x: &Frame) -> Result<TrainedRedacting> {
        let mut replacements = Vec::with_capacity(self.protected_attributes.len());
        for attr in &self.protected_attributes {
            let col = attr.column(x)?;
            let value = most_frequent(x.column_values(col)).ok_or_else(|| {
                LaleError::data(format!("cannot redact '{}' without training rows", attr.feature))
            })?;
            tracing::debug!(feature = %attr.feature, value = %value, "Learned redaction value");
            replacements.push((attr.feature.clone(), value));
        }
        Ok(TrainedRedacting { replacements })
    }
}

/// Most frequent value; ties go to the value seen first.
fn most_frequent<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: HashMap<String, (usize, usize, &Value)> = HashMap::new();
    for (position, value) in values.enumerate() {
        counts
            .entry(label_key(value))
            .or_insert((0, position, value))
            .0 += 1;
    }
    counts
        .into_values()
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, value)| value.clone())
}

impl Trainable for Redacting {
    fn name(&self) -> &str {
        "Redacting"
    }

    fn fit(&self, x: &Frame, _y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        Ok(Box::new(self.fit_redacting(x)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainedRedacting {
    replacements: Vec<(FeatureRef, Value)>,
}

impl TrainedRedacting {
    pub fn replacements(&self) -> &[(FeatureRef, Value)] {
        &self.replacements
    }
}

impl Trained for TrainedRedacting {
    fn name(&self) -> &str {
        "Redacting"
    }

    fn transform(&self, x: &Frame) -> Result<Frame> {
        let mut out = x.clone();
        for (feature, value) in &self.replacements {
            let col = x.column_index(feature)?;
            out.set_column(col, vec![value.clone(); x.row_count()])?;
        }
        Ok(out)
    }
}
