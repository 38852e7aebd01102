//! Reduces one owner's raw observations to the fixed-width
//! [`SufficientStatistics`] vector its operation names (spec §4.3 "For
//! each supported statistical operation, reduce the per-owner input to
//! a fixed-width vector of sufficient statistics"). This runs entirely
//! on the owner's side, before anything is noised or shared; the
//! coordinator and peer nodes never see the slices passed in here.

use crate::error::{Error, Result};

use super::statistics::SufficientStatistics;

fn sum(xs: &[f64]) -> f64 {
    xs.iter().sum()
}

fn sum_sq(xs: &[f64]) -> f64 {
    xs.iter().map(|x| x * x).sum()
}

pub fn mean_from_raw(x: &[f64]) -> SufficientStatistics {
    SufficientStatistics::Mean {
        sum: sum(x),
        n: x.len() as f64,
    }
}

pub fn variance_from_raw(x: &[f64]) -> SufficientStatistics {
    SufficientStatistics::VarianceLike {
        sum: sum(x),
        sum_sq: sum_sq(x),
        n: x.len() as f64,
    }
}

fn require_equal_length(a: usize, b: usize, context: &str) -> Result<()> {
    if a != b {
        return Err(Error::InvalidInput(format!(
            "{context}: lengths differ ({a} vs {b})"
        )));
    }
    Ok(())
}

/// Shared by `correlation` and `covariance`. Spec §4.3 edge case:
/// mismatched `x`/`y` lengths are rejected before any noise or sharing
/// happens (spec §8 scenario 2).
pub fn correlation_from_raw(x: &[f64], y: &[f64]) -> Result<SufficientStatistics> {
    require_equal_length(x.len(), y.len(), "correlation/covariance")?;
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    Ok(SufficientStatistics::CorrelationLike {
        sum_x: sum(x),
        sum_y: sum(y),
        sum_xy,
        sum_x2: sum_sq(x),
        sum_y2: sum_sq(y),
        n: x.len() as f64,
    })
}

pub fn linear_regression_from_raw(x: &[f64], y: &[f64]) -> Result<SufficientStatistics> {
    require_equal_length(x.len(), y.len(), "linear_regression")?;
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    Ok(SufficientStatistics::LinearRegression {
        sum_x: sum(x),
        sum_y: sum(y),
        sum_xy,
        sum_x2: sum_sq(x),
        n: x.len() as f64,
    })
}

/// Buckets `x` into `bucket_count` equal-width bins over `[min(x), max(x)]`
/// (spec: "noisy histogram (10-50 buckets ... ), min, max, n"). An empty
/// slice yields an all-zero histogram with `min = max = 0.0`; reconstruction
/// falls back to `min` per spec §4.3's edge-case rule.
pub fn percentile_from_raw(x: &[f64], bucket_count: usize) -> SufficientStatistics {
    if x.is_empty() {
        return SufficientStatistics::PercentileLike {
            histogram: vec![0.0; bucket_count],
            min: 0.0,
            max: 0.0,
            n: 0.0,
        };
    }
    let min = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut histogram = vec![0.0; bucket_count];
    let span = (max - min).max(f64::EPSILON);
    for &v in x {
        let mut bucket = (((v - min) / span) * bucket_count as f64) as usize;
        if bucket >= bucket_count {
            bucket = bucket_count - 1;
        }
        histogram[bucket] += 1.0;
    }
    SufficientStatistics::PercentileLike {
        histogram,
        min,
        max,
        n: x.len() as f64,
    }
}

pub fn min_from_raw(x: &[f64]) -> SufficientStatistics {
    SufficientStatistics::Extreme {
        value: x.iter().cloned().fold(f64::INFINITY, f64::min),
    }
}

pub fn max_from_raw(x: &[f64]) -> SufficientStatistics {
    SufficientStatistics::Extreme {
        value: x.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// Paired differences `a[i] - b[i]`; spec: "paired tests require pairs
/// of equal length".
pub fn paired_ttest_from_raw(a: &[f64], b: &[f64]) -> Result<SufficientStatistics> {
    require_equal_length(a.len(), b.len(), "paired_ttest")?;
    let d: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    Ok(SufficientStatistics::PairedTTest {
        sum_d: sum(&d),
        sum_d2: sum_sq(&d),
        n: d.len() as f64,
    })
}

pub fn independent_ttest_from_raw(group1: &[f64], group2: &[f64]) -> SufficientStatistics {
    SufficientStatistics::IndependentTTest {
        sum1: sum(group1),
        sum1_sq: sum_sq(group1),
        n1: group1.len() as f64,
        sum2: sum(group2),
        sum2_sq: sum_sq(group2),
        n2: group2.len() as f64,
    }
}

/// Spec edge case: "chi-square requires `expected.length == observed.length`".
pub fn chi_square_from_raw(observed: &[f64], expected: &[f64]) -> Result<SufficientStatistics> {
    require_equal_length(observed.len(), expected.len(), "chi_square")?;
    let terms = observed
        .iter()
        .zip(expected)
        .map(|(o, e)| if *e == 0.0 { 0.0 } else { (o - e).powi(2) / e })
        .collect();
    Ok(SufficientStatistics::ChiSquare { terms })
}

/// Buckets `x` into `bucket_count` equal-width bins over the
/// operator-supplied `(min, max)` range (spec: "bucket counts over
/// operator-supplied (min,max,K)"), unlike `percentile_from_raw`'s
/// self-determined range.
pub fn histogram_from_raw(x: &[f64], min: f64, max: f64, bucket_count: usize) -> SufficientStatistics {
    let mut counts = vec![0.0; bucket_count];
    let span = (max - min).max(f64::EPSILON);
    for &v in x {
        if v < min || v > max {
            continue;
        }
        let mut bucket = (((v - min) / span) * bucket_count as f64) as usize;
        if bucket >= bucket_count {
            bucket = bucket_count - 1;
        }
        counts[bucket] += 1.0;
    }
    SufficientStatistics::Histogram { counts }
}
