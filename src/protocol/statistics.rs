//! Sufficient statistics: one variant per row of the operation table,
//! each reducible to a fixed-width vector of [`FieldElement`]s for
//! secret sharing and back.
//!
//! Field elements are unsigned residues mod p; the values flowing
//! through this module are real-valued sums, counts and noise, so every
//! boundary crossing goes through a fixed-point encoding (scale
//! `10^6`, two's-complement-style: residues in the upper half of the
//! field represent negatives) rather than truncating to an integer.

use serde::{Deserialize, Serialize};

use crate::field::{FieldElement, FIELD_PRIME};

const FIXED_POINT_SCALE: f64 = 1_000_000.0;

pub fn to_field(x: f64) -> FieldElement {
    FieldElement::from_i64((x * FIXED_POINT_SCALE).round() as i64)
}

pub fn from_field(f: FieldElement) -> f64 {
    let half = FIELD_PRIME / 2;
    let v = f.value();
    let signed = if v > half {
        -((FIELD_PRIME - v) as f64)
    } else {
        v as f64
    };
    signed / FIXED_POINT_SCALE
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum NoiseMechanism {
    Laplace,
    Gaussian,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SufficientStatistics {
    Mean { sum: f64, n: f64 },
    /// Shared by `variance` and `std_dev`.
    VarianceLike { sum: f64, sum_sq: f64, n: f64 },
    /// Shared by `correlation` and `covariance`.
    CorrelationLike {
        sum_x: f64,
        sum_y: f64,
        sum_xy: f64,
        sum_x2: f64,
        sum_y2: f64,
        n: f64,
    },
    LinearRegression {
        sum_x: f64,
        sum_y: f64,
        sum_xy: f64,
        sum_x2: f64,
        n: f64,
    },
    /// Shared by `percentile` and `median`.
    PercentileLike {
        histogram: Vec<f64>,
        min: f64,
        max: f64,
        n: f64,
    },
    /// Shared by `min` and `max`: the owner's local extreme, already
    /// privatized before packaging (spec: "local min or max
    /// (post-noise)").
    Extreme { value: f64 },
    PairedTTest { sum_d: f64, sum_d2: f64, n: f64 },
    IndependentTTest {
        sum1: f64,
        sum1_sq: f64,
        n1: f64,
        sum2: f64,
        sum2_sq: f64,
        n2: f64,
    },
    ChiSquare { terms: Vec<f64> },
    Histogram { counts: Vec<f64> },
}

impl SufficientStatistics {
    /// The statistic's components as plain `f64`s, in the same order
    /// `to_field_vec`/`noise_mask` use. Exposed so the privatization
    /// step in [`super::lifecycle::prepare_data`] can clip and noise in
    /// the real domain before the fixed-point field conversion.
    pub fn raw_components(&self) -> Vec<f64> {
        match self {
            SufficientStatistics::Mean { sum, n } => vec![*sum, *n],
            SufficientStatistics::VarianceLike { sum, sum_sq, n } => vec![*sum, *sum_sq, *n],
            SufficientStatistics::CorrelationLike {
                sum_x,
                sum_y,
                sum_xy,
                sum_x2,
                sum_y2,
                n,
            } => vec![*sum_x, *sum_y, *sum_xy, *sum_x2, *sum_y2, *n],
            SufficientStatistics::LinearRegression {
                sum_x,
                sum_y,
                sum_xy,
                sum_x2,
                n,
            } => vec![*sum_x, *sum_y, *sum_xy, *sum_x2, *n],
            SufficientStatistics::PercentileLike {
                histogram,
                min,
                max,
                n,
            } => {
                let mut v = histogram.clone();
                v.push(*min);
                v.push(*max);
                v.push(*n);
                v
            }
            SufficientStatistics::Extreme { value } => vec![*value],
            SufficientStatistics::PairedTTest { sum_d, sum_d2, n } => vec![*sum_d, *sum_d2, *n],
            SufficientStatistics::IndependentTTest {
                sum1,
                sum1_sq,
                n1,
                sum2,
                sum2_sq,
                n2,
            } => vec![*sum1, *sum1_sq, *n1, *sum2, *sum2_sq, *n2],
            SufficientStatistics::ChiSquare { terms } => terms.clone(),
            SufficientStatistics::Histogram { counts } => counts.clone(),
        }
    }

    /// `true` per component wherever independent DP noise is applied;
    /// `false` for count fields of ratio statistics, which are left
    /// exact (spec §4.3 noise rule).
    pub fn noise_mask(&self) -> Vec<bool> {
        match self {
            SufficientStatistics::Mean { .. } => vec![true, false],
            SufficientStatistics::VarianceLike { .. } => vec![true, true, false],
            SufficientStatistics::CorrelationLike { .. } => {
                vec![true, true, true, true, true, false]
            }
            SufficientStatistics::LinearRegression { .. } => vec![true, true, true, true, false],
            SufficientStatistics::PercentileLike { histogram, .. } => {
                let mut mask = vec![true; histogram.len()];
                mask.extend([false, false, false]); // min, max, n
                mask
            }
            SufficientStatistics::Extreme { .. } => vec![true],
            SufficientStatistics::PairedTTest { .. } => vec![true, true, false],
            SufficientStatistics::IndependentTTest { .. } => {
                vec![true, true, false, true, true, false]
            }
            SufficientStatistics::ChiSquare { terms } => vec![true; terms.len()],
            SufficientStatistics::Histogram { counts } => vec![true; counts.len()],
        }
    }

    pub fn to_field_vec(&self) -> Vec<FieldElement> {
        self.raw_components().into_iter().map(to_field).collect()
    }

    /// Rebuilds a statistics value of the same shape from a field
    /// vector (e.g. after summing shares). The template's variant and
    /// vector-length fields (histogram bucket count) are preserved.
    pub fn from_field_vec(&self, fields: &[FieldElement]) -> SufficientStatistics {
        let v: Vec<f64> = fields.iter().copied().map(from_field).collect();
        match self {
            SufficientStatistics::Mean { .. } => {
                SufficientStatistics::Mean { sum: v[0], n: v[1] }
            }
            SufficientStatistics::VarianceLike { .. } => SufficientStatistics::VarianceLike {
                sum: v[0],
                sum_sq: v[1],
                n: v[2],
            },
            SufficientStatistics::CorrelationLike { .. } => SufficientStatistics::CorrelationLike {
                sum_x: v[0],
                sum_y: v[1],
                sum_xy: v[2],
                sum_x2: v[3],
                sum_y2: v[4],
                n: v[5],
            },
            SufficientStatistics::LinearRegression { .. } => SufficientStatistics::LinearRegression {
                sum_x: v[0],
                sum_y: v[1],
                sum_xy: v[2],
                sum_x2: v[3],
                n: v[4],
            },
            SufficientStatistics::PercentileLike { histogram, .. } => {
                let k = histogram.len();
                SufficientStatistics::PercentileLike {
                    histogram: v[0..k].to_vec(),
                    min: v[k],
                    max: v[k + 1],
                    n: v[k + 2],
                }
            }
            SufficientStatistics::Extreme { .. } => SufficientStatistics::Extreme { value: v[0] },
            SufficientStatistics::PairedTTest { .. } => SufficientStatistics::PairedTTest {
                sum_d: v[0],
                sum_d2: v[1],
                n: v[2],
            },
            SufficientStatistics::IndependentTTest { .. } => SufficientStatistics::IndependentTTest {
                sum1: v[0],
                sum1_sq: v[1],
                n1: v[2],
                sum2: v[3],
                sum2_sq: v[4],
                n2: v[5],
            },
            SufficientStatistics::ChiSquare { .. } => SufficientStatistics::ChiSquare { terms: v },
            SufficientStatistics::Histogram { .. } => SufficientStatistics::Histogram { counts: v },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_round_trips_within_scale_precision() {
        for x in [0.0, 1.0, -1.0, 3.141592, -99.5, 123456.789] {
            let back = from_field(to_field(x));
            assert!((back - x).abs() < 1e-5, "{x} round-tripped to {back}");
        }
    }

    #[test]
    fn mean_components_round_trip() {
        let stats = SufficientStatistics::Mean { sum: 42.5, n: 10.0 };
        let fields = stats.to_field_vec();
        let back = stats.from_field_vec(&fields);
        match back {
            SufficientStatistics::Mean { sum, n } => {
                assert!((sum - 42.5).abs() < 1e-5);
                assert!((n - 10.0).abs() < 1e-5);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn noise_mask_exempts_counts() {
        let stats = SufficientStatistics::VarianceLike {
            sum: 1.0,
            sum_sq: 1.0,
            n: 5.0,
        };
        assert_eq!(stats.noise_mask(), vec![true, true, false]);
    }

    #[test]
    fn histogram_mask_exempts_only_min_max_n() {
        let stats = SufficientStatistics::PercentileLike {
            histogram: vec![1.0, 2.0, 3.0],
            min: 0.0,
            max: 10.0,
            n: 3.0,
        };
        assert_eq!(
            stats.noise_mask(),
            vec![true, true, true, false, false, false]
        );
    }
}
