//! # lale-resample
//!
//! Resampling operators. A resampler rebalances the training data before a
//! nested operator is fitted on it; every other method is forwarded to the
//! trained nested operator, so resampling never touches prediction data.
//!
//! The resampling algorithms themselves are external collaborators behind the
//! [`Resampler`] trait. [`SmoteEnn`] wraps the combined over- and
//! under-sampler with a validated hyperparameter schema.

pub mod resampler;
pub mod smoteenn;

pub use resampler::{ResampleSummary, Resampler, ResamplerOperator, TrainedResampler};
pub use smoteenn::{
    RandomState, SamplingStrategy, SmoteEnn, SmoteEnnBackend, SmoteEnnBuilder, SmoteEnnParams,
    TargetClasses, TargetCountsFn,
};
