//! Operator descriptors: documentation, tags, hyperparameters, and data shapes
//! for each lifecycle stage.

use serde_json::{Map, Value, json};
use std::fmt;

use crate::data::{Frame, Labels};
use crate::error::{LaleError, Result};
use crate::schema::hyperparams::HyperparamSchema;

/// Lifecycle stage a data shape applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataStage {
    InputFit,
    InputTransform,
    OutputTransform,
    InputPredict,
    OutputPredict,
    InputPredictProba,
    OutputPredictProba,
    InputDecisionFunction,
    OutputDecisionFunction,
}

impl DataStage {
    pub const ALL: [DataStage; 9] = [
        Self::InputFit,
        Self::InputTransform,
        Self::OutputTransform,
        Self::InputPredict,
        Self::OutputPredict,
        Self::InputPredictProba,
        Self::OutputPredictProba,
        Self::InputDecisionFunction,
        Self::OutputDecisionFunction,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::InputFit => "input_fit",
            Self::InputTransform => "input_transform",
            Self::OutputTransform => "output_transform",
            Self::InputPredict => "input_predict",
            Self::OutputPredict => "output_predict",
            Self::InputPredictProba => "input_predict_proba",
            Self::OutputPredictProba => "output_predict_proba",
            Self::InputDecisionFunction => "input_decision_function",
            Self::OutputDecisionFunction => "output_decision_function",
        }
    }
}

impl fmt::Display for DataStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Accepted cell type inside a data shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    Number,
    String,
    Boolean,
    NumberOrString,
    Label,
    Any,
}

impl CellShape {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::NumberOrString => value.is_number() || value.is_string() || value.is_null(),
            Self::Label => value.is_number() || value.is_string() || value.is_boolean(),
            Self::Any => true,
        }
    }

    fn to_json_schema(self) -> Value {
        match self {
            Self::Number => json!({"type": "number"}),
            Self::String => json!({"type": "string"}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::NumberOrString => json!({"anyOf": [{"type": "number"}, {"type": "string"}]}),
            Self::Label => json!({"anyOf": [
                {"type": "number"}, {"type": "string"}, {"type": "boolean"}
            ]}),
            Self::Any => json!({"laleType": "Any"}),
        }
    }
}

/// Shape of the data flowing in or out of a lifecycle stage.
#[derive(Debug, Clone, PartialEq)]
pub enum DataShape {
    /// Features `X` (rows of cells), with optional labels `y` for fitting.
    Features {
        cells: CellShape,
        labels: Option<CellShape>,
    },
    /// A label vector (predictions).
    Labels(CellShape),
    /// A matrix of cells (transformed features, probabilities, scores).
    Matrix(CellShape),
    Any,
}

impl DataShape {
    /// Check a feature frame against the shape.
    pub fn check_frame(&self, stage: DataStage, frame: &Frame) -> Result<()> {
        let cells = match self {
            Self::Features { cells, .. } | Self::Matrix(cells) => *cells,
            Self::Labels(_) | Self::Any => return Ok(()),
        };
        for (i, row) in frame.rows().iter().enumerate() {
            if let Some((j, cell)) = row.iter().enumerate().find(|(_, c)| !cells.accepts(c)) {
                return Err(LaleError::data(format!(
                    "{stage}: cell ({i}, '{}') = {cell} does not match {}",
                    frame.columns()[j],
                    cells.to_json_schema()
                )));
            }
        }
        Ok(())
    }

    /// Check labels against the shape.
    pub fn check_labels(&self, stage: DataStage, labels: &Labels) -> Result<()> {
        let cells = match self {
            Self::Features {
                labels: Some(cells),
                ..
            }
            | Self::Labels(cells) => *cells,
            _ => return Ok(()),
        };
        if let Some((i, label)) = labels.iter().enumerate().find(|(_, l)| !cells.accepts(l)) {
            return Err(LaleError::data(format!(
                "{stage}: label {i} = {label} does not match {}",
                cells.to_json_schema()
            )));
        }
        Ok(())
    }

    pub fn to_json_schema(&self) -> Value {
        let matrix = |cells: CellShape| {
            json!({
                "description": "Features; the outer array is over samples.",
                "type": "array",
                "items": {"type": "array", "items": cells.to_json_schema()},
            })
        };
        match self {
            Self::Features { cells, labels } => {
                let mut properties = Map::new();
                properties.insert("X".into(), matrix(*cells));
                let mut required = vec!["X"];
                if let Some(labels) = labels {
                    properties.insert(
                        "y".into(),
                        json!({
                            "description": "Target labels; the array is over samples.",
                            "type": "array",
                            "items": labels.to_json_schema(),
                        }),
                    );
                    required.push("y");
                }
                json!({
                    "type": "object",
                    "required": required,
                    "additionalProperties": false,
                    "properties": properties,
                })
            }
            Self::Labels(cells) => json!({"type": "array", "items": cells.to_json_schema()}),
            Self::Matrix(cells) => matrix(*cells),
            Self::Any => json!({"laleType": "Any"}),
        }
    }
}

/// Operator tags, grouped as in the combined schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags {
    pub pre: Vec<String>,
    pub op: Vec<String>,
    pub post: Vec<String>,
}

impl Tags {
    pub fn op<I: IntoIterator<Item = S>, S: Into<String>>(tags: I) -> Self {
        Self {
            op: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add tags describing the data preprocessing the operator expects.
    pub fn with_pre<I: IntoIterator<Item = S>, S: Into<String>>(mut self, tags: I) -> Self {
        self.pre.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn has_op(&self, tag: &str) -> bool {
        self.op.iter().any(|t| t == tag)
    }
}

/// Static description of an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorDescriptor {
    pub name: String,
    pub description: String,
    pub documentation_url: Option<String>,
    pub tags: Tags,
    pub hyperparams: HyperparamSchema,
    data: Vec<(DataStage, DataShape)>,
}

impl OperatorDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            documentation_url: None,
            tags: Tags::default(),
            hyperparams: HyperparamSchema::new(),
            data: Vec::new(),
        }
    }

    pub fn documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn hyperparams(mut self, schema: HyperparamSchema) -> Self {
        self.hyperparams = schema;
        self
    }

    pub fn data(mut self, stage: DataStage, shape: DataShape) -> Self {
        self.data.retain(|(s, _)| *s != stage);
        self.data.push((stage, shape));
        self
    }

    pub fn data_shape(&self, stage: DataStage) -> Option<&DataShape> {
        self.data
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, shape)| shape)
    }

    /// Check input features for a stage. Stages without a declared shape accept anything.
    pub fn check_input(&self, stage: DataStage, x: &Frame, y: Option<&Labels>) -> Result<()> {
        if let Some(shape) = self.data_shape(stage) {
            shape.check_frame(stage, x)?;
            if let Some(y) = y {
                shape.check_labels(stage, y)?;
            }
        }
        Ok(())
    }

    /// Render the combined schema document.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert("hyperparams".into(), self.hyperparams.to_json_schema());
        for stage in DataStage::ALL {
            if let Some(shape) = self.data_shape(stage) {
                properties.insert(stage.key().into(), shape.to_json_schema());
            }
        }
        let mut doc = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "description": self.description,
            "type": "object",
            "tags": {
                "pre": self.tags.pre,
                "op": self.tags.op,
                "post": self.tags.post,
            },
            "properties": properties,
        });
        if let Some(url) = &self.documentation_url {
            doc["documentation_url"] = json!(url);
        }
        doc
    }
}
