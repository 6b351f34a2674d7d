//! Declarative operator schemas: hyperparameter shapes and validation, plus
//! the data shapes an operator accepts at each lifecycle stage.

pub mod descriptor;
pub mod hyperparams;
pub mod shape;

pub use descriptor::{CellShape, DataShape, DataStage, OperatorDescriptor, Tags};
pub use hyperparams::{Alternative, HyperparamSchema, HyperparamSpec, Hyperparams};
pub use shape::{Bounds, Callable, Component, ParamValue, ScalarKind, Shape};
