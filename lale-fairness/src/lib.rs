//! # lale-fairness
//!
//! Fairness tooling for Lale operators. A [`FairnessInfo`] names the
//! favorable labels and the protected attributes with their privileged
//! reference groups; scorers, encoders, mitigations and splits are all
//! configured from it.
//!
//! Group metrics that cannot be computed (for example an empty privileged
//! group) log a warning and return the configured sentinel instead of failing.

pub mod datasets;
pub mod encoder;
pub mod info;
pub mod metrics;
pub mod redacting;
pub mod split;

pub use datasets::{DatasetSpec, FairnessDataset, load_dataset, load_from_config};
pub use encoder::{Combine, ProtectedAttributesEncoder, Remainder};
pub use info::{FairnessInfo, GroupValue, ProtectedAttribute};
pub use metrics::{
    BaseMetric, CombinedScorer, FairnessMetric, FairnessScorer, MetricValue,
    accuracy_and_disparate_impact, average_odds_difference, blended_and_disparate_impact,
    disparate_impact, equal_opportunity_difference, r2_and_disparate_impact,
    statistical_parity_difference, theil_index_scorer,
};
pub use redacting::{Redacting, TrainedRedacting};
pub use split::{
    FairSplit, FairStratifiedKFold, SplitOptions, column_for_stratification,
    fair_stratified_train_test_split,
};
