//! Predictive-performance scorers.

use serde_json::Value;

use crate::data::{Frame, Labels, values_equal};
use crate::error::{LaleError, Result};
use crate::operator::Trained;

/// A scorer computes a number from data and predictions; higher is better.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    /// Score precomputed predictions against the true labels.
    fn scoring(&self, x: &Frame, y_true: &[Value], y_pred: &[Value]) -> Result<f64>;

    /// Predict with the estimator, then score.
    fn score(&self, estimator: &dyn Trained, x: &Frame, y: &Labels) -> Result<f64> {
        let y_pred = estimator.predict(x)?;
        self.scoring(x, y, &y_pred)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccuracyScorer;

impl Scorer for AccuracyScorer {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn scoring(&self, _x: &Frame, y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
        accuracy(y_true, y_pred)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct R2Scorer;

impl Scorer for R2Scorer {
    fn name(&self) -> &str {
        "r2"
    }

    fn scoring(&self, _x: &Frame, y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
        r2(y_true, y_pred)
    }
}

/// Fraction of predictions equal to the true label.
pub fn accuracy(y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| values_equal(t, p))
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Coefficient of determination. Constant targets score 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2(y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let t = numeric(y_true)?;
    let p = numeric(y_pred)?;
    let mean = t.iter().sum::<f64>() / t.len() as f64;
    let ss_res: f64 = t.iter().zip(&p).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = t.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

fn check_lengths(y_true: &[Value], y_pred: &[Value]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(LaleError::data(format!(
            "{} labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(LaleError::data("cannot score empty labels"));
    }
    Ok(())
}

fn numeric(values: &[Value]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|v| match v {
            Value::Bool(b) => Ok(f64::from(u8::from(*b))),
            other => other
                .as_f64()
                .ok_or_else(|| LaleError::data(format!("non-numeric label {other}"))),
        })
        .collect()
}
