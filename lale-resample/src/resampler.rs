//! The resampler contract and the adapter that fits a nested operator on
//! resampled data.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use lale_core::data::class_counts;
use lale_core::{Frame, LaleError, Labels, Result, Trainable, Trained};

/// An external resampling algorithm.
pub trait Resampler: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Return a rebalanced copy of `(x, y)`.
    fn fit_resample(&self, x: &Frame, y: &Labels) -> Result<(Frame, Labels)>;
}

/// Class counts before and after resampling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResampleSummary {
    pub before: BTreeMap<String, usize>,
    pub after: BTreeMap<String, usize>,
}

impl ResampleSummary {
    pub fn rows_before(&self) -> usize {
        self.before.values().sum()
    }

    pub fn rows_after(&self) -> usize {
        self.after.values().sum()
    }
}

/// Trainable adapter: resample at fit time, then fit the nested operator.
#[derive(Debug, Clone)]
pub struct ResamplerOperator {
    name: String,
    operator: Arc<dyn Trainable>,
    resampler: Arc<dyn Resampler>,
}

impl ResamplerOperator {
    pub fn new(
        name: impl Into<String>,
        operator: Arc<dyn Trainable>,
        resampler: Arc<dyn Resampler>,
    ) -> Self {
        Self {
            name: name.into(),
            operator,
            resampler,
        }
    }

    pub fn operator(&self) -> &Arc<dyn Trainable> {
        &self.operator
    }

    pub fn resampler(&self) -> &Arc<dyn Resampler> {
        &self.resampler
    }

    /// Fit and keep the concrete trained type.
    pub fn fit_resampled(&self, x: &Frame, y: Option<&Labels>) -> Result<TrainedResampler> {
        let y = y.ok_or_else(|| {
            LaleError::data(format!("{} requires labels to resample", self.name))
        })?;
        if x.row_count() != y.len() {
            return Err(LaleError::data(format!(
                "{} features but {} labels",
                x.row_count(),
                y.len()
            )));
        }

        let (x_res, y_res) = self.resampler.fit_resample(x, y)?;
        if x_res.row_count() != y_res.len() {
            return Err(LaleError::resampler(format!(
                "{} returned {} rows but {} labels",
                self.resampler.name(),
                x_res.row_count(),
                y_res.len()
            )));
        }

        let summary = ResampleSummary {
            before: class_counts(y),
            after: class_counts(&y_res),
        };
        tracing::info!(
            operator = %self.name,
            resampler = self.resampler.name(),
            rows_before = summary.rows_before(),
            rows_after = summary.rows_after(),
            "Resampled training data"
        );

        let trained = self.operator.fit(&x_res, Some(&y_res))?;
        Ok(TrainedResampler {
            name: self.name.clone(),
            operator: trained,
            summary,
        })
    }
}

impl Trainable for ResamplerOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&self, x: &Frame, y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        Ok(Box::new(self.fit_resampled(x, y)?))
    }
}

/// A fitted resampling adapter. All methods forward to the trained nested operator.
#[derive(Debug)]
pub struct TrainedResampler {
    name: String,
    operator: Box<dyn Trained>,
    summary: ResampleSummary,
}

impl TrainedResampler {
    pub fn summary(&self) -> &ResampleSummary {
        &self.summary
    }

    pub fn operator(&self) -> &dyn Trained {
        self.operator.as_ref()
    }
}

impl Trained for TrainedResampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_classifier(&self) -> bool {
        self.operator.is_classifier()
    }

    fn transform(&self, x: &Frame) -> Result<Frame> {
        self.operator.transform(x)
    }

    fn predict(&self, x: &Frame) -> Result<Labels> {
        self.operator.predict(x)
    }

    fn predict_proba(&self, x: &Frame) -> Result<Frame> {
        self.operator.predict_proba(x)
    }

    fn decision_function(&self, x: &Frame) -> Result<Frame> {
        self.operator.decision_function(x)
    }
}
