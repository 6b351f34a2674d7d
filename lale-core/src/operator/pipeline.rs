//! Linear pipelines of operators.

use std::sync::Arc;

use crate::data::{Frame, Labels};
use crate::error::{LaleError, Result};
use crate::operator::{Trainable, Trained};

/// Ordered steps. Fitting transforms the data through every step but the last,
/// then fits the last step on the transformed data.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn Trainable>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<T: Trainable + 'static>(mut self, op: T) -> Self {
        self.steps.push(Arc::new(op));
        self
    }

    pub fn shared_step(mut self, op: Arc<dyn Trainable>) -> Self {
        self.steps.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Trainable for Pipeline {
    fn name(&self) -> &str {
        "Pipeline"
    }

    fn fit(&self, x: &Frame, y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        let Some((last, prefix)) = self.steps.split_last() else {
            return Err(LaleError::data("cannot fit an empty pipeline"));
        };

        let mut trained = Vec::with_capacity(self.steps.len());
        let mut current = x.clone();
        for step in prefix {
            let fitted = step.fit(&current, y)?;
            current = fitted.transform(&current)?;
            tracing::debug!(
                step = step.name(),
                columns = current.column_count(),
                "Fitted pipeline step"
            );
            trained.push(fitted);
        }
        trained.push(last.fit(&current, y)?);
        Ok(Box::new(TrainedPipeline { steps: trained }))
    }
}

/// A fitted pipeline.
#[derive(Debug)]
pub struct TrainedPipeline {
    steps: Vec<Box<dyn Trained>>,
}

impl TrainedPipeline {
    fn split(&self) -> Result<(&dyn Trained, &[Box<dyn Trained>])> {
        self.steps
            .split_last()
            .map(|(last, prefix)| (last.as_ref(), prefix))
            .ok_or_else(|| LaleError::NotFitted("Pipeline".into()))
    }

    fn through_prefix(&self, x: &Frame) -> Result<(&dyn Trained, Frame)> {
        let (last, prefix) = self.split()?;
        let mut current = x.clone();
        for step in prefix {
            current = step.transform(&current)?;
        }
        Ok((last, current))
    }
}

impl Trained for TrainedPipeline {
    fn name(&self) -> &str {
        "Pipeline"
    }

    fn is_classifier(&self) -> bool {
        self.steps.last().is_some_and(|s| s.is_classifier())
    }

    fn transform(&self, x: &Frame) -> Result<Frame> {
        let (last, current) = self.through_prefix(x)?;
        last.transform(&current)
    }

    fn predict(&self, x: &Frame) -> Result<Labels> {
        let (last, current) = self.through_prefix(x)?;
        last.predict(&current)
    }

    fn predict_proba(&self, x: &Frame) -> Result<Frame> {
        let (last, current) = self.through_prefix(x)?;
        last.predict_proba(&current)
    }

    fn decision_function(&self, x: &Frame) -> Result<Frame> {
        let (last, current) = self.through_prefix(x)?;
        last.decision_function(&current)
    }
}
