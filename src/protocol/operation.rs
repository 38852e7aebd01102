//! The statistical operation catalog. Each variant names one row of the
//! sufficient-statistics table in [`super::statistics`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Mean,
    Variance,
    StdDev,
    Correlation,
    Covariance,
    LinearRegression,
    Percentile,
    Median,
    Min,
    Max,
    PairedTTest,
    IndependentTTest,
    ChiSquare,
    Histogram,
}

impl Operation {
    /// `true` for operations whose closed form divides by the owner's
    /// count (so the count field stays noise-free; see
    /// [`super::statistics::SufficientStatistics::noise_mask`]).
    pub fn is_ratio_statistic(self) -> bool {
        !matches!(self, Operation::Histogram | Operation::ChiSquare)
    }

    /// Bucket count for percentile/median noisy histograms:
    /// `clip(ceil(n/5), 10, 50)`.
    pub fn histogram_bucket_count(n: usize) -> usize {
        let raw = (n as f64 / 5.0).ceil() as usize;
        raw.clamp(10, 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_count_is_clipped() {
        assert_eq!(Operation::histogram_bucket_count(1), 10);
        assert_eq!(Operation::histogram_bucket_count(100), 20);
        assert_eq!(Operation::histogram_bucket_count(1000), 50);
    }

    #[test]
    fn ratio_classification_matches_spec_table() {
        assert!(Operation::Mean.is_ratio_statistic());
        assert!(Operation::PairedTTest.is_ratio_statistic());
        assert!(!Operation::Histogram.is_ratio_statistic());
        assert!(!Operation::ChiSquare.is_ratio_statistic());
    }
}
