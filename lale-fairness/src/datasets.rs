//! Local copies of fairness benchmark datasets.
//!
//! Files are read from disk only; place the CSVs under the configured data
//! directory (see [`DataConfig`]).

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use lale_core::config::DataConfig;
use lale_core::data::{CsvSource, label_key};
use lale_core::{FeatureRef, Frame, LaleError, Labels, Result};

use crate::info::{FairnessInfo, GroupValue, ProtectedAttribute};

/// Where a dataset's target lives and how its fairness is described.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSpec {
    pub name: String,
    pub file_name: String,
    pub target: FeatureRef,
    pub fairness_info: FairnessInfo,
    pub delimiter: u8,
}

impl DatasetSpec {
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        target: impl Into<FeatureRef>,
        fairness_info: FairnessInfo,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            target: target.into(),
            fairness_info,
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// German credit data (OpenML `credit-g`).
    pub fn credit_g() -> Self {
        Self::new(
            "credit-g",
            "credit-g.csv",
            "class",
            FairnessInfo::new(
                ["good"],
                vec![
                    ProtectedAttribute::new(
                        "personal_status",
                        ["male div/sep", "male mar/wid", "male single"],
                    ),
                    ProtectedAttribute::new("age", [GroupValue::range(26.0, 1000.0)]),
                ],
            ),
        )
    }

    /// Census income data (OpenML `adult`).
    pub fn adult() -> Self {
        Self::new(
            "adult",
            "adult.csv",
            "class",
            FairnessInfo::new(
                [">50K"],
                vec![
                    ProtectedAttribute::new("race", ["White"]),
                    ProtectedAttribute::new("sex", ["Male"]),
                ],
            ),
        )
    }

    /// Firefighter promotion exams.
    pub fn ricci() -> Self {
        Self::new(
            "ricci",
            "ricci.csv",
            "Promotion",
            FairnessInfo::new(["Promotion"], vec![ProtectedAttribute::new("Race", ["W"])]),
        )
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "credit-g" => Some(Self::credit_g()),
            "adult" => Some(Self::adult()),
            "ricci" => Some(Self::ricci()),
            _ => None,
        }
    }
}

/// Features, labels and the matching fairness descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FairnessDataset {
    pub x: Frame,
    pub y: Labels,
    pub fairness_info: FairnessInfo,
}

/// Load a dataset from a local CSV, optionally encoding it numerically.
pub async fn load_dataset(
    path: &Path,
    spec: &DatasetSpec,
    preprocess: bool,
) -> Result<FairnessDataset> {
    let frame = CsvSource::new(path)
        .with_delimiter(spec.delimiter)
        .load(None)
        .await?;
    let (x, y) = frame.split_off_column(&spec.target)?;
    spec.fairness_info.columns(&x)?;

    let dataset = FairnessDataset {
        x,
        y,
        fairness_info: spec.fairness_info.clone(),
    };
    let dataset = if preprocess { dataset.preprocess()? } else { dataset };
    tracing::info!(
        dataset = %spec.name,
        rows = dataset.x.row_count(),
        columns = dataset.x.column_count(),
        preprocess,
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Load `spec.file_name` from the configured data directory.
pub async fn load_from_config(
    config: &DataConfig,
    workspace: &Path,
    spec: &DatasetSpec,
    preprocess: bool,
) -> Result<FairnessDataset> {
    let path = config.dataset_path(workspace, &spec.file_name);
    if !tokio::fs::try_exists(&path).await? {
        return Err(LaleError::data(format!(
            "dataset '{}' not found at {}",
            spec.name,
            path.display()
        )));
    }
    load_dataset(&path, spec, preprocess).await
}

impl FairnessDataset {
    /// Numeric encoding: protected attributes become 0/1 in place, labels 0/1,
    /// other string columns are one-hot encoded as `<column>_<category>`.
    pub fn preprocess(self) -> Result<Self> {
        let protected = self.fairness_info.columns(&self.x)?;
        let mut columns = Vec::with_capacity(self.x.column_count());
        for (col, name) in self.x.columns().iter().enumerate() {
            let values = self.x.column_values(col);
            if let Some(k) = protected.iter().position(|&p| p == col) {
                let attr = &self.fairness_info.protected_attributes[k];
                let encoded = values
                    .map(|v| Value::from(u8::from(attr.is_privileged(v))))
                    .collect();
                columns.push((name.clone(), encoded));
            } else if self.x.is_numeric_column(col) {
                columns.push((name.clone(), values.cloned().collect()));
            } else {
                let cells: Vec<String> = values.map(label_key).collect();
                let categories: BTreeSet<&str> = cells.iter().map(String::as_str).collect();
                for category in categories {
                    let one_hot = cells
                        .iter()
                        .map(|c| Value::from(u8::from(c == category)))
                        .collect();
                    columns.push((format!("{name}_{category}"), one_hot));
                }
            }
        }

        let x = if columns.is_empty() {
            self.x.select_columns(&[])?
        } else {
            Frame::from_columns(columns)?
        };
        let y = self.fairness_info.encode_labels(&self.y);
        // Positional features are renamed to the header they resolved to.
        let protected_attributes = protected
            .iter()
            .map(|&col| ProtectedAttribute::new(self.x.columns()[col].clone(), [1i64]))
            .collect();
        Ok(Self {
            x,
            y,
            fairness_info: FairnessInfo::new([1i64], protected_attributes),
        })
    }
}
