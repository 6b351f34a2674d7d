//! Hyperparameter specifications and the validation engine.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::schema::shape::{ParamValue, Shape};

/// One accepted alternative of a hyperparameter, with optional documentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub shape: Shape,
    pub description: Option<String>,
}

/// A named, typed description of one configuration option.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparamSpec {
    pub name: String,
    pub description: String,
    pub any_of: Vec<Alternative>,
    pub default: Option<Value>,
    pub required: bool,
    pub relevant_to_optimizer: bool,
}

impl HyperparamSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            any_of: Vec::new(),
            default: None,
            required: false,
            relevant_to_optimizer: false,
        }
    }

    /// Add an accepted shape.
    pub fn shape(mut self, shape: Shape) -> Self {
        self.any_of.push(Alternative {
            shape,
            description: None,
        });
        self
    }

    /// Add an accepted shape with its own documentation.
    pub fn documented_shape(mut self, shape: Shape, description: impl Into<String>) -> Self {
        self.any_of.push(Alternative {
            shape,
            description: Some(description.into()),
        });
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn relevant_to_optimizer(mut self) -> Self {
        self.relevant_to_optimizer = true;
        self
    }

    /// Whether any declared shape accepts the value.
    pub fn accepts(&self, value: &ParamValue) -> bool {
        self.any_of.iter().any(|alt| alt.shape.accepts(value))
    }

    /// The declared shapes, rendered as `a | b | c`.
    pub fn expected(&self) -> String {
        self.any_of
            .iter()
            .map(|alt| alt.shape.describe())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn to_json_schema(&self) -> Value {
        let any_of: Vec<Value> = self
            .any_of
            .iter()
            .map(|alt| {
                let mut schema = alt.shape.to_json_schema();
                if let Some(doc) = &alt.description {
                    schema["description"] = json!(doc);
                }
                schema
            })
            .collect();
        let mut schema = json!({
            "description": self.description,
            "anyOf": any_of,
        });
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

/// The hyperparameter schema of an operator. Keys outside the schema are rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HyperparamSchema {
    specs: Vec<HyperparamSpec>,
}

impl HyperparamSchema {
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    pub fn with(mut self, spec: HyperparamSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn specs(&self) -> &[HyperparamSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&HyperparamSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Check proposed values against the declared shapes and fill in defaults.
    pub fn validate(
        &self,
        proposed: BTreeMap<String, ParamValue>,
    ) -> Result<Hyperparams, ConfigError> {
        for (name, value) in &proposed {
            let spec = self
                .get(name)
                .ok_or_else(|| ConfigError::UnknownHyperparameter(name.clone()))?;
            if !spec.accepts(value) {
                tracing::debug!(
                    hyperparameter = %name,
                    found = %value.describe(),
                    "Rejected hyperparameter"
                );
                return Err(ConfigError::invalid(
                    name.clone(),
                    spec.expected(),
                    value.describe(),
                ));
            }
        }

        let mut values = proposed;
        for spec in &self.specs {
            if values.contains_key(&spec.name) {
                continue;
            }
            if spec.required {
                return Err(ConfigError::missing(spec.name.clone()));
            }
            if let Some(default) = &spec.default {
                values.insert(spec.name.clone(), ParamValue::Json(default.clone()));
            }
        }

        tracing::debug!(count = values.len(), "Validated hyperparameters");
        Ok(Hyperparams { values })
    }

    /// Validate a JSON object of hyperparameters.
    pub fn validate_json(&self, proposed: &Map<String, Value>) -> Result<Hyperparams, ConfigError> {
        let proposed = proposed
            .iter()
            .map(|(k, v)| (k.clone(), ParamValue::Json(v.clone())))
            .collect();
        self.validate(proposed)
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .specs
            .iter()
            .map(|s| (s.name.clone(), s.to_json_schema()))
            .collect();
        let relevant: Vec<&str> = self
            .specs
            .iter()
            .filter(|s| s.relevant_to_optimizer)
            .map(|s| s.name.as_str())
            .collect();
        let required: Vec<&str> = self
            .specs
            .iter()
            .filter(|s| s.required)
            .map(|s| s.name.as_str())
            .collect();
        json!({
            "allOf": [{
                "type": "object",
                "additionalProperties": false,
                "required": required,
                "relevantToOptimizer": relevant,
                "properties": properties,
            }]
        })
    }
}

/// Validated hyperparameter values, defaults included.
#[derive(Debug, Clone, Default)]
pub struct Hyperparams {
    values: BTreeMap<String, ParamValue>,
}

impl Hyperparams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn get_json(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(ParamValue::as_json)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render for logs; non-JSON values appear as their descriptions.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    ParamValue::Json(json) => json.clone(),
                    other => Value::String(other.describe()),
                };
                (k.clone(), rendered)
            })
            .collect();
        Value::Object(map)
    }
}
