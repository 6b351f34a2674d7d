//! Column filter keeping the numeric columns seen at fit time.

use std::sync::LazyLock;

use crate::data::{FeatureRef, Frame, Labels};
use crate::error::Result;
use crate::operator::{Trainable, Trained};
use crate::schema::{CellShape, DataShape, DataStage, OperatorDescriptor, Tags};

static DESCRIPTOR: LazyLock<OperatorDescriptor> = LazyLock::new(|| {
    let features = DataShape::Features {
        cells: CellShape::NumberOrString,
        labels: None,
    };
    OperatorDescriptor::new("KeepNumbers", "Transformer to drop non-numeric columns.")
        .documentation_url("https://github.com/IBM/lale")
        .tags(Tags::op(["transformer"]).with_pre(["categoricals"]))
        .data(DataStage::InputFit, features.clone())
        .data(DataStage::InputTransform, features.clone())
        .data(DataStage::InputPredict, features)
        .data(DataStage::OutputTransform, DataShape::Matrix(CellShape::Number))
});

#[derive(Debug, Clone, Copy, Default)]
pub struct KeepNumbers;

impl KeepNumbers {
    pub fn descriptor() -> &'static OperatorDescriptor {
        &DESCRIPTOR
    }
}

impl Trainable for KeepNumbers {
    fn name(&self) -> &str {
        "KeepNumbers"
    }

    fn fit(&self, x: &Frame, _y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        DESCRIPTOR.check_input(DataStage::InputFit, x, None)?;
        let keep: Vec<String> = (0..x.column_count())
            .filter(|&i| x.is_numeric_column(i))
            .map(|i| x.columns()[i].clone())
            .collect();
        tracing::debug!(
            kept = keep.len(),
            dropped = x.column_count() - keep.len(),
            "Fitted KeepNumbers"
        );
        Ok(Box::new(TrainedKeepNumbers { columns: keep }))
    }
}

#[derive(Debug, Clone)]
pub struct TrainedKeepNumbers {
    columns: Vec<String>,
}

impl TrainedKeepNumbers {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Trained for TrainedKeepNumbers {
    fn name(&self) -> &str {
        "KeepNumbers"
    }

    fn transform(&self, x: &Frame) -> Result<Frame> {
        DESCRIPTOR.check_input(DataStage::InputTransform, x, None)?;
        let indices = self
            .columns
            .iter()
            .map(|c| x.column_index(&FeatureRef::Name(c.clone())))
            .collect::<Result<Vec<_>>>()?;
        x.select_columns(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keeps_numeric_columns() {
        let x = Frame::new(
            vec!["age".into(), "job".into(), "score".into()],
            vec![
                vec![json!(30), json!("clerk"), json!(1.5)],
                vec![json!(41), json!("chef"), json!(null)],
            ],
        )
        .unwrap();
        let trained = KeepNumbers.fit(&x, None).unwrap();
        let out = trained.transform(&x).unwrap();
        assert_eq!(out.columns(), &["age".to_string(), "score".to_string()]);
        assert_eq!(out.row_count(), 2);
    }

    #[test]
    fn test_missing_column_at_transform() {
        let x = Frame::from_rows(vec![vec![json!(1)]]).unwrap();
        let trained = KeepNumbers.fit(&x, None).unwrap();
        let other = Frame::new(vec!["g".into()], vec![vec![json!(1)]]).unwrap();
        assert!(trained.transform(&other).is_err());
    }

    #[test]
    fn test_descriptor_output_is_numeric() {
        let doc = KeepNumbers::descriptor().to_json_schema();
        assert_eq!(
            doc["properties"]["output_transform"]["items"]["items"]["type"],
            json!("number")
        );
    }

    #[test]
    fn test_descriptor_input_stages_and_tags() {
        let descriptor = KeepNumbers::descriptor();
        assert_eq!(descriptor.tags.pre, vec!["categoricals".to_string()]);
        assert!(descriptor.tags.has_op("transformer"));
        for stage in [DataStage::InputFit, DataStage::InputTransform, DataStage::InputPredict] {
            assert!(descriptor.data_shape(stage).is_some(), "{stage}");
        }
        let doc = descriptor.to_json_schema();
        assert_eq!(doc["tags"]["pre"], json!(["categoricals"]));
        assert!(doc["properties"].get("input_predict").is_some());
    }

    #[test]
    fn test_rejects_non_tabular_cells() {
        let x = Frame::from_rows(vec![vec![json!(1), json!([1, 2])]]).unwrap();
        assert!(KeepNumbers.fit(&x, None).is_err());
    }
}
