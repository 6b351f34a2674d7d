//! Hyperparameter value shapes and the values checked against them.

use serde_json::{Value, json};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::data::values_equal;
use crate::operator::OperatorRef;

/// Kind of a scalar shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Number,
    String,
}

impl ScalarKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
        }
    }
}

/// Numeric bounds of a scalar shape. Ignored for booleans and strings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
}

impl Bounds {
    fn contains(&self, x: f64) -> bool {
        let above = match self.minimum {
            Some(min) if self.exclusive_minimum => x > min,
            Some(min) => x >= min,
            None => true,
        };
        let below = match self.maximum {
            Some(max) if self.exclusive_maximum => x < max,
            Some(max) => x <= max,
            None => true,
        };
        above && below
    }

    fn is_unbounded(&self) -> bool {
        self.minimum.is_none() && self.maximum.is_none()
    }

    fn describe(&self) -> String {
        match (self.minimum, self.maximum) {
            (Some(lo), Some(hi)) => format!(
                "in {}{lo}, {hi}{}",
                if self.exclusive_minimum { "(" } else { "[" },
                if self.exclusive_maximum { ")" } else { "]" }
            ),
            (Some(lo), None) => {
                format!("{} {lo}", if self.exclusive_minimum { ">" } else { ">=" })
            }
            (None, Some(hi)) => {
                format!("{} {hi}", if self.exclusive_maximum { "<" } else { "<=" })
            }
            (None, None) => String::new(),
        }
    }
}

/// One accepted shape of a hyperparameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Boolean, integer, number or string, with optional numeric bounds.
    Scalar(ScalarKind, Bounds),
    /// An enumerated literal set, possibly including `null`.
    Literals(Vec<Value>),
    /// A structured JSON object.
    Record,
    /// An opaque callable reference.
    Callable,
    /// An opaque external object, optionally restricted to a type tag.
    Component(Option<String>),
    /// A nested pipeline operator, planned or trainable.
    Operator,
    Any,
}

impl Shape {
    pub fn boolean() -> Self {
        Self::Scalar(ScalarKind::Boolean, Bounds::default())
    }

    pub fn integer() -> Self {
        Self::Scalar(ScalarKind::Integer, Bounds::default())
    }

    pub fn number() -> Self {
        Self::Scalar(ScalarKind::Number, Bounds::default())
    }

    pub fn string() -> Self {
        Self::Scalar(ScalarKind::String, Bounds::default())
    }

    pub fn null() -> Self {
        Self::Literals(vec![Value::Null])
    }

    pub fn literals<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Literals(values.into_iter().map(Into::into).collect())
    }

    pub fn component(tag: impl Into<String>) -> Self {
        Self::Component(Some(tag.into()))
    }

    pub fn with_minimum(self, minimum: f64) -> Self {
        self.map_bounds(|b| {
            b.minimum = Some(minimum);
            b.exclusive_minimum = false;
        })
    }

    pub fn with_exclusive_minimum(self, minimum: f64) -> Self {
        self.map_bounds(|b| {
            b.minimum = Some(minimum);
            b.exclusive_minimum = true;
        })
    }

    pub fn with_maximum(self, maximum: f64) -> Self {
        self.map_bounds(|b| {
            b.maximum = Some(maximum);
            b.exclusive_maximum = false;
        })
    }

    fn map_bounds(self, f: impl FnOnce(&mut Bounds)) -> Self {
        match self {
            Self::Scalar(kind, mut bounds) => {
                f(&mut bounds);
                Self::Scalar(kind, bounds)
            }
            other => other,
        }
    }

    /// Whether the value satisfies this shape.
    pub fn accepts(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Scalar(ScalarKind::Boolean, _), ParamValue::Json(v)) => v.is_boolean(),
            (Self::Scalar(ScalarKind::String, _), ParamValue::Json(v)) => v.is_string(),
            (Self::Scalar(ScalarKind::Integer, bounds), ParamValue::Json(Value::Number(n))) => {
                (n.is_i64() || n.is_u64()) && n.as_f64().is_some_and(|x| bounds.contains(x))
            }
            (Self::Scalar(ScalarKind::Number, bounds), ParamValue::Json(Value::Number(n))) => {
                n.as_f64().is_some_and(|x| bounds.contains(x))
            }
            (Self::Scalar(..), _) => false,
            (Self::Literals(options), ParamValue::Json(v)) => {
                options.iter().any(|o| values_equal(o, v))
            }
            (Self::Literals(_), _) => false,
            (Self::Record, ParamValue::Json(v)) => v.is_object(),
            (Self::Record, _) => false,
            (Self::Callable, ParamValue::Callable(_)) => true,
            (Self::Callable, _) => false,
            (Self::Component(None), ParamValue::Component(_)) => true,
            (Self::Component(Some(tag)), ParamValue::Component(c)) => c.type_tag() == tag,
            (Self::Component(_), _) => false,
            (Self::Operator, ParamValue::Operator(_)) => true,
            (Self::Operator, _) => false,
        }
    }

    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Scalar(kind, bounds) if bounds.is_unbounded() => kind.as_str().to_string(),
            Self::Scalar(kind, bounds) => format!("{} {}", kind.as_str(), bounds.describe()),
            Self::Literals(values) => {
                let items: Vec<String> = values.iter().map(Value::to_string).collect();
                format!("one of [{}]", items.join(", "))
            }
            Self::Record => "object".to_string(),
            Self::Callable => "callable".to_string(),
            Self::Component(Some(tag)) => format!("component<{tag}>"),
            Self::Component(None) => "component".to_string(),
            Self::Operator => "operator".to_string(),
            Self::Any => "any".to_string(),
        }
    }

    /// JSON-schema fragment for documentation output.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Scalar(kind, bounds) => {
                let mut schema = json!({ "type": kind.as_str() });
                if let Some(min) = bounds.minimum {
                    schema["minimum"] = json!(min);
                    if bounds.exclusive_minimum {
                        schema["exclusiveMinimum"] = json!(true);
                    }
                }
                if let Some(max) = bounds.maximum {
                    schema["maximum"] = json!(max);
                    if bounds.exclusive_maximum {
                        schema["exclusiveMaximum"] = json!(true);
                    }
                }
                schema
            }
            Self::Literals(values) => json!({ "enum": values }),
            Self::Record => json!({ "type": "object" }),
            Self::Callable => json!({ "laleType": "callable" }),
            Self::Component(Some(tag)) => json!({ "laleType": tag }),
            Self::Component(None) | Self::Any => json!({ "laleType": "Any" }),
            Self::Operator => json!({ "laleType": "operator" }),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A named, type-erased callable.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Arc<dyn Any + Send + Sync>,
}

impl Callable {
    pub fn new<F: Any + Send + Sync>(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recover the concrete callable type.
    pub fn downcast_ref<F: Any>(&self) -> Option<&F> {
        self.func.downcast_ref::<F>()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable").field("name", &self.name).finish()
    }
}

/// A type-erased external object tagged with a type name.
#[derive(Clone)]
pub struct Component {
    type_tag: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Component {
    pub fn new<T: Any + Send + Sync>(type_tag: impl Into<String>, value: T) -> Self {
        Self {
            type_tag: type_tag.into(),
            inner: Arc::new(value),
        }
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("type_tag", &self.type_tag)
            .finish()
    }
}

/// A proposed hyperparameter value.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Json(Value),
    Callable(Callable),
    Component(Component),
    Operator(OperatorRef),
}

impl ParamValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }

    /// Short description of the value for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Json(v) => {
                let text = v.to_string();
                if text.chars().count() > 60 {
                    format!("{}...", text.chars().take(60).collect::<String>())
                } else {
                    text
                }
            }
            Self::Callable(c) => format!("callable '{}'", c.name()),
            Self::Component(c) => format!("component<{}>", c.type_tag()),
            Self::Operator(op) => format!("operator '{}'", op.name()),
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Callable> for ParamValue {
    fn from(value: Callable) -> Self {
        Self::Callable(value)
    }
}

impl From<Component> for ParamValue {
    fn from(value: Component) -> Self {
        Self::Component(value)
    }
}

impl From<OperatorRef> for ParamValue {
    fn from(value: OperatorRef) -> Self {
        Self::Operator(value)
    }
}
