//! # lale-core
//!
//! Foundations shared by the Lale crates: tabular frames, the declarative
//! hyperparameter schema engine, the operator lifecycle (planned, trainable,
//! trained), pipelines, basic scorers, configuration and tracing setup.
//!
//! Operators describe their hyperparameters with a [`schema::HyperparamSchema`].
//! Proposed values are checked against a union of [`schema::Shape`]s before
//! an operator can be built, so invalid or missing arguments surface as a
//! [`ConfigError`] naming the offending key.

pub mod config;
pub mod data;
pub mod error;
pub mod expr;
pub mod metrics;
pub mod operator;
pub mod operators;
pub mod schema;
pub mod telemetry;

pub use config::{ConfigOverrides, LaleConfig, load_config};
pub use data::{FeatureRef, Frame, Labels};
pub use error::{ConfigError, LaleError, Result};
pub use expr::{Expr, eval};
pub use metrics::{AccuracyScorer, R2Scorer, Scorer};
pub use operator::{
    Method, OperatorRef, OperatorResolver, Pipeline, PlannedOperator, Trainable, Trained,
};
pub use schema::{
    HyperparamSchema, HyperparamSpec, Hyperparams, OperatorDescriptor, ParamValue, Shape,
};
