//! Protocol engine (L2, spec §4.3): the statistical operation catalog,
//! sufficient statistics, DP noise injection, the share lifecycle
//! (`prepare_data` → `process_share_at_node` → `aggregate_results` →
//! `verify_result`), and per-session privacy-budget accounting.

pub mod budget;
pub mod lifecycle;
pub mod noise;
pub mod operation;
pub mod reduce;
pub mod statistics;

pub use budget::PrivacyBudget;
pub use lifecycle::{
    aggregate_results, finalize, prepare_data, process_share_at_node, verify_result, FinalResult,
    Metadata, NodeOutcome, PreparedData, PrivacyParameters, ShareResult,
};
pub use operation::Operation;
pub use reduce::{
    chi_square_from_raw, correlation_from_raw, histogram_from_raw, independent_ttest_from_raw,
    linear_regression_from_raw, max_from_raw, mean_from_raw, min_from_raw, paired_ttest_from_raw,
    percentile_from_raw, variance_from_raw,
};
pub use statistics::{from_field, to_field, NoiseMechanism, SufficientStatistics};
