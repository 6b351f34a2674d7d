//! Fairness scorers and the combined accuracy/R² with disparate impact scorers.
//!
//! Rows are split into a privileged group (every protected attribute in its
//! reference group) and an unprivileged group (everything else). Metrics whose
//! denominator is undefined for the given data log a warning and return the
//! configured ill-defined value (0.0 by default).

use serde_json::Value;
use std::fmt;

use lale_core::config::FairnessSettings;
use lale_core::metrics::{accuracy, r2};
use lale_core::{Frame, LaleError, Labels, Result, Scorer, Trained};

use crate::info::FairnessInfo;

/// The group fairness metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairnessMetric {
    DisparateImpact,
    StatisticalParityDifference,
    EqualOpportunityDifference,
    AverageOddsDifference,
    TheilIndex,
}

impl FairnessMetric {
    pub fn name(self) -> &'static str {
        match self {
            Self::DisparateImpact => "disparate_impact",
            Self::StatisticalParityDifference => "statistical_parity_difference",
            Self::EqualOpportunityDifference => "equal_opportunity_difference",
            Self::AverageOddsDifference => "average_odds_difference",
            Self::TheilIndex => "theil_index",
        }
    }
}

impl fmt::Display for FairnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A metric value, with the reason when the metric was ill-defined.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub value: f64,
    pub warning: Option<String>,
}

impl MetricValue {
    fn defined(value: f64) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn is_ill_defined(&self) -> bool {
        self.warning.is_some()
    }
}

/// Confusion counts of one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCounts {
    pub rows: usize,
    pub predicted_favorable: usize,
    pub actual_favorable: usize,
    pub true_positives: usize,
    pub false_positives: usize,
}

impl GroupCounts {
    fn add(&mut self, actual: bool, predicted: bool) {
        self.rows += 1;
        self.predicted_favorable += usize::from(predicted);
        self.actual_favorable += usize::from(actual);
        self.true_positives += usize::from(actual && predicted);
        self.false_positives += usize::from(!actual && predicted);
    }

    fn actual_unfavorable(&self) -> usize {
        self.rows - self.actual_favorable
    }

    pub fn selection_rate(&self) -> Option<f64> {
        ratio(self.predicted_favorable, self.rows)
    }

    pub fn true_positive_rate(&self) -> Option<f64> {
        ratio(self.true_positives, self.actual_favorable)
    }

    pub fn false_positive_rate(&self) -> Option<f64> {
        ratio(self.false_positives, self.actual_unfavorable())
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// Confusion counts of the privileged and unprivileged groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupConfusion {
    pub privileged: GroupCounts,
    pub unprivileged: GroupCounts,
}

impl GroupConfusion {
    pub fn compute(
        info: &FairnessInfo,
        x: &Frame,
        y_true: &[Value],
        y_pred: &[Value],
    ) -> Result<Self> {
        FairnessInfo::check_lengths(x, y_true, "labels")?;
        FairnessInfo::check_lengths(x, y_pred, "predictions")?;
        let privileged = info.privileged_mask(x)?;
        let mut counts = Self::default();
        for ((is_priv, t), p) in privileged.into_iter().zip(y_true).zip(y_pred) {
            let group = if is_priv {
                &mut counts.privileged
            } else {
                &mut counts.unprivileged
            };
            group.add(info.is_favorable(t), info.is_favorable(p));
        }
        Ok(counts)
    }
}

/// Scorer for one fairness metric under a fairness descriptor.
#[derive(Debug, Clone)]
pub struct FairnessScorer {
    metric: FairnessMetric,
    info: FairnessInfo,
    settings: FairnessSettings,
}

impl FairnessScorer {
    pub fn new(metric: FairnessMetric, info: FairnessInfo) -> Self {
        Self {
            metric,
            info,
            settings: FairnessSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: FairnessSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn metric(&self) -> FairnessMetric {
        self.metric
    }

    pub fn info(&self) -> &FairnessInfo {
        &self.info
    }

    /// Compute the metric, reporting ill-defined cases instead of failing.
    pub fn evaluate(&self, x: &Frame, y_true: &[Value], y_pred: &[Value]) -> Result<MetricValue> {
        let value = match self.metric {
            FairnessMetric::TheilIndex => {
                FairnessInfo::check_lengths(x, y_true, "labels")?;
                FairnessInfo::check_lengths(x, y_pred, "predictions")?;
                theil_index(
                    &self.info.favorable_mask(y_true),
                    &self.info.favorable_mask(y_pred),
                )
            }
            metric => {
                let counts = GroupConfusion::compute(&self.info, x, y_true, y_pred)?;
                group_metric(metric, &counts)
            }
        };
        Ok(match value {
            Ok(v) => MetricValue::defined(v),
            Err(reason) => self.ill_defined(reason),
        })
    }

    /// Score predictions without true labels. Only disparate impact and
    /// statistical parity difference depend on the predictions alone.
    pub fn scoring_predictions(&self, x: &Frame, y_pred: &[Value]) -> Result<f64> {
        match self.metric {
            FairnessMetric::DisparateImpact | FairnessMetric::StatisticalParityDifference => {
                Ok(self.evaluate(x, y_pred, y_pred)?.value)
            }
            metric => Err(LaleError::data(format!("{metric} needs true labels"))),
        }
    }

    /// Predict with the estimator, then evaluate.
    pub fn evaluate_estimator(
        &self,
        estimator: &dyn Trained,
        x: &Frame,
        y: &Labels,
    ) -> Result<MetricValue> {
        let y_pred = estimator.predict(x)?;
        self.evaluate(x, y, &y_pred)
    }

    fn ill_defined(&self, reason: &str) -> MetricValue {
        let warning = format!(
            "{} is ill-defined ({reason}); returning {}",
            self.metric, self.settings.ill_defined_value
        );
        tracing::warn!(metric = self.metric.name(), reason, "{warning}");
        MetricValue {
            value: self.settings.ill_defined_value,
            warning: Some(warning),
        }
    }
}

impl Scorer for FairnessScorer {
    fn name(&self) -> &str {
        self.metric.name()
    }

    fn scoring(&self, x: &Frame, y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
        Ok(self.evaluate(x, y_true, y_pred)?.value)
    }
}

fn group_metric(
    metric: FairnessMetric,
    counts: &GroupConfusion,
) -> std::result::Result<f64, &'static str> {
    let (p, u) = (&counts.privileged, &counts.unprivileged);
    if p.rows == 0 {
        return Err("no privileged rows");
    }
    if u.rows == 0 {
        return Err("no unprivileged rows");
    }
    let tpr = |g: &GroupCounts| g.true_positive_rate().ok_or("a group has no favorable labels");
    let fpr = |g: &GroupCounts| {
        g.false_positive_rate()
            .ok_or("a group has no unfavorable labels")
    };
    let (rate_p, rate_u) = (
        p.selection_rate().unwrap_or_default(),
        u.selection_rate().unwrap_or_default(),
    );
    match metric {
        FairnessMetric::DisparateImpact if rate_p == 0.0 => {
            Err("privileged group has no favorable predictions")
        }
        FairnessMetric::DisparateImpact => Ok(rate_u / rate_p),
        FairnessMetric::StatisticalParityDifference => Ok(rate_u - rate_p),
        FairnessMetric::EqualOpportunityDifference => Ok(tpr(u)? - tpr(p)?),
        FairnessMetric::AverageOddsDifference => {
            Ok(0.5 * ((fpr(u)? - fpr(p)?) + (tpr(u)? - tpr(p)?)))
        }
        FairnessMetric::TheilIndex => Err("theil_index is not a group metric"),
    }
}

/// Generalized entropy index with alpha = 1 over benefits `pred - actual + 1`.
fn theil_index(actual: &[bool], predicted: &[bool]) -> std::result::Result<f64, &'static str> {
    let benefits: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(&a, &p)| f64::from(u8::from(p)) - f64::from(u8::from(a)) + 1.0)
        .collect();
    if benefits.is_empty() {
        return Err("no rows");
    }
    let mean = benefits.iter().sum::<f64>() / benefits.len() as f64;
    if mean == 0.0 {
        return Err("mean benefit is zero");
    }
    let total: f64 = benefits
        .iter()
        .map(|b| b / mean)
        .filter(|r| *r > 0.0)
        .map(|r| r * r.ln())
        .sum();
    Ok(total / benefits.len() as f64)
}

/// Predictive performance measure blended with disparate impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMetric {
    Accuracy,
    R2,
    /// Accuracy for classifiers, R² otherwise.
    Blended,
}

/// `base × fairness factor`, where the factor penalizes symmetric disparate
/// impact below the configured threshold.
#[derive(Debug, Clone)]
pub struct CombinedScorer {
    base: BaseMetric,
    disparate_impact: FairnessScorer,
    name: &'static str,
}

impl CombinedScorer {
    pub fn new(base: BaseMetric, info: FairnessInfo) -> Self {
        let name = match base {
            BaseMetric::Accuracy => "accuracy_and_disparate_impact",
            BaseMetric::R2 => "r2_and_disparate_impact",
            BaseMetric::Blended => "blended_and_disparate_impact",
        };
        Self {
            base,
            disparate_impact: FairnessScorer::new(FairnessMetric::DisparateImpact, info),
            name,
        }
    }

    pub fn with_settings(mut self, settings: FairnessSettings) -> Self {
        self.disparate_impact = self.disparate_impact.with_settings(settings);
        self
    }

    /// Scale `base` by the fairness factor derived from `disparate_impact`.
    /// R² is first mapped to `1 / (2 - R²)` so the result stays positive.
    pub fn combine(&self, base: f64, disparate_impact: f64) -> f64 {
        let base = match self.base {
            BaseMetric::R2 => bounded_r2(base),
            BaseMetric::Accuracy | BaseMetric::Blended => base,
        };
        base * fairness_factor(
            disparate_impact,
            self.disparate_impact.settings.disparate_impact_threshold,
        )
    }

    fn base_score(&self, classifier: bool, y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
        match self.base {
            BaseMetric::Accuracy => accuracy(y_true, y_pred),
            BaseMetric::R2 => r2(y_true, y_pred).map(bounded_r2),
            BaseMetric::Blended if classifier => accuracy(y_true, y_pred),
            BaseMetric::Blended => r2(y_true, y_pred).map(bounded_r2),
        }
    }

    fn score_with(
        &self,
        classifier: bool,
        x: &Frame,
        y_true: &[Value],
        y_pred: &[Value],
    ) -> Result<f64> {
        let base = self.base_score(classifier, y_true, y_pred)?;
        let di = self.disparate_impact.evaluate(x, y_true, y_pred)?.value;
        let threshold = self.disparate_impact.settings.disparate_impact_threshold;
        let factor = fairness_factor(di, threshold);
        tracing::debug!(
            scorer = self.name,
            base,
            disparate_impact = di,
            factor,
            "Combined score"
        );
        Ok(base * factor)
    }
}

impl Scorer for CombinedScorer {
    fn name(&self) -> &str {
        self.name
    }

    /// Without an estimator, the blended scorer treats predictions as classes.
    fn scoring(&self, x: &Frame, y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
        self.score_with(true, x, y_true, y_pred)
    }

    fn score(&self, estimator: &dyn Trained, x: &Frame, y: &Labels) -> Result<f64> {
        let y_pred = estimator.predict(x)?;
        self.score_with(estimator.is_classifier(), x, y, &y_pred)
    }
}

/// Maps R² from `(-inf, 1]` onto `(0, 1]`.
fn bounded_r2(r2: f64) -> f64 {
    1.0 / (2.0 - r2.min(1.0))
}

/// `s / threshold` when symmetric disparate impact `s = min(di, 1/di)` is
/// below the threshold, else 1.
pub fn fairness_factor(disparate_impact: f64, threshold: f64) -> f64 {
    let symmetric = if disparate_impact <= 0.0 {
        0.0
    } else {
        disparate_impact.min(1.0 / disparate_impact)
    };
    if symmetric < threshold {
        symmetric / threshold
    } else {
        1.0
    }
}

pub fn disparate_impact(info: FairnessInfo) -> FairnessScorer {
    FairnessScorer::new(FairnessMetric::DisparateImpact, info)
}

pub fn statistical_parity_difference(info: FairnessInfo) -> FairnessScorer {
    FairnessScorer::new(FairnessMetric::StatisticalParityDifference, info)
}

pub fn equal_opportunity_difference(info: FairnessInfo) -> FairnessScorer {
    FairnessScorer::new(FairnessMetric::EqualOpportunityDifference, info)
}

pub fn average_odds_difference(info: FairnessInfo) -> FairnessScorer {
    FairnessScorer::new(FairnessMetric::AverageOddsDifference, info)
}

pub fn theil_index_scorer(info: FairnessInfo) -> FairnessScorer {
    FairnessScorer::new(FairnessMetric::TheilIndex, info)
}

pub fn accuracy_and_disparate_impact(info: FairnessInfo) -> CombinedScorer {
    CombinedScorer::new(BaseMetric::Accuracy, info)
}

pub fn r2_and_disparate_impact(info: FairnessInfo) -> CombinedScorer {
    CombinedScorer::new(BaseMetric::R2, info)
}

pub fn blended_and_disparate_impact(info: FairnessInfo) -> CombinedScorer {
    CombinedScorer::new(BaseMetric::Blended, info)
}
