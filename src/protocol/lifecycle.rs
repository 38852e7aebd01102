//! Share lifecycle: `prepare_data` → `process_share_at_node` →
//! `aggregate_results` → `verify_result`, exactly the four stages of
//! spec §4.3.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::FieldElement;
use crate::secret_sharing::{HybridSecretSharing, Share};

use super::noise;
use super::operation::Operation;
use super::statistics::{NoiseMechanism, SufficientStatistics};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyParameters {
    pub epsilon: f64,
    pub delta: f64,
    pub sensitivity: f64,
    pub mechanism: NoiseMechanism,
    pub clipping_threshold: f64,
    pub noise_magnitudes: Vec<f64>,
}

impl PrivacyParameters {
    pub fn new(epsilon: f64, delta: f64, sensitivity: f64, mechanism: NoiseMechanism) -> Self {
        PrivacyParameters {
            epsilon,
            delta,
            sensitivity,
            mechanism,
            clipping_threshold: f64::INFINITY,
            noise_magnitudes: Vec::new(),
        }
    }

    fn clip(&self, v: f64) -> f64 {
        v.clamp(-self.clipping_threshold, self.clipping_threshold)
    }
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub operation: Operation,
    pub threshold: u32,
    pub node_count: u32,
    pub is_final_aggregation: bool,
    pub privacy_params: PrivacyParameters,
    /// Target percentile in `[0,1]` for `Operation::Percentile`; fixed
    /// at `0.5` for `Operation::Median`.
    pub target_percentile: f64,
}

impl Metadata {
    /// A copy of this metadata with `is_final_aggregation` overridden,
    /// used by the coordinator to drive the same `Metadata` through
    /// both the per-owner relay step and the aggregator's final step.
    pub fn clone_with_final(&self, is_final_aggregation: bool) -> Metadata {
        Metadata {
            is_final_aggregation,
            ..self.clone()
        }
    }
}

pub struct PreparedData {
    pub shares_per_node: HashMap<String, Vec<Share>>,
    pub metadata: Metadata,
}

/// Clips and privatizes every noise-eligible component of `stats`, then
/// secret-shares the resulting field vector across `node_ids` (default
/// threshold `ceil(n/2)`, spec §4.3).
pub fn prepare_data(
    stats: &SufficientStatistics,
    operation: Operation,
    node_ids: &[String],
    privacy_params: &PrivacyParameters,
    is_final_aggregation: bool,
    target_percentile: Option<f64>,
) -> Result<PreparedData> {
    if node_ids.len() < 2 {
        return Err(Error::InvalidInput(
            "prepare_data requires at least two node ids".into(),
        ));
    }
    let n = node_ids.len();
    let threshold = ((n as f64) / 2.0).ceil() as u32;

    let mask = stats.noise_mask();
    let mut raw = stats.raw_components();
    let mut noise_magnitudes = Vec::with_capacity(raw.len());
    for (component, noised) in raw.iter_mut().zip(mask.iter()) {
        let clipped = privacy_params.clip(*component);
        if *noised {
            let n = noise::sample(
                privacy_params.mechanism,
                privacy_params.sensitivity,
                privacy_params.epsilon,
                privacy_params.delta,
            );
            noise_magnitudes.push(n.abs());
            *component = clipped + n;
        } else {
            noise_magnitudes.push(0.0);
            *component = clipped;
        }
    }

    let mut params = privacy_params.clone();
    params.noise_magnitudes = noise_magnitudes;

    let field_vec: Vec<FieldElement> = raw.into_iter().map(super::statistics::to_field).collect();

    let mut shares_per_node: HashMap<String, Vec<Share>> = node_ids
        .iter()
        .map(|id| (id.clone(), Vec::with_capacity(field_vec.len())))
        .collect();

    for value in field_vec {
        let mut shares = HybridSecretSharing::share(value, n, threshold as usize)?;
        Share::attach_verification_batch(&mut shares);
        for (node_id, share) in node_ids.iter().zip(shares.into_iter()) {
            shares_per_node.get_mut(node_id).unwrap().push(share);
        }
    }

    Ok(PreparedData {
        shares_per_node,
        metadata: Metadata {
            operation,
            threshold,
            node_count: n as u32,
            is_final_aggregation,
            privacy_params: params,
            target_percentile: target_percentile.unwrap_or(0.5),
        },
    })
}

pub enum ShareResult {
    Intermediate(Vec<Share>),
    Final(FinalResult),
}

/// Two distinct meanings of "peer" depending on phase, both shaped as
/// one component-vector per peer:
///
/// - Non-final (`is_final_aggregation == false`): every assigned node
///   deals its own noisy statistics vector to every other node via
///   [`prepare_data`], so `own_share` is the slice this node dealt to
///   itself and `peer_shares` are the slices the *other* owner-nodes
///   dealt to this same node. All of them share this node's `x`
///   coordinate, so they combine by plain field addition
///   ([`sum_share_vectors`]) into this node's share of the grand total.
/// - Final (`is_final_aggregation == true`): `own_share` is this
///   (aggregator) node's own already-summed share from the step above,
///   and `peer_shares` are the other assigned nodes' summed shares,
///   forwarded to the aggregator. These have *different* `x`
///   coordinates from each other, so they must never be added; they're
///   exactly the `>= threshold` points Lagrange interpolation
///   (or the equivalent additive/replicated reconstruction) needs.
pub fn process_share_at_node(
    own_share: &[Share],
    peer_shares: &[Vec<Share>],
    stats_template: &SufficientStatistics,
    metadata: &Metadata,
) -> Result<ShareResult> {
    if !metadata.is_final_aggregation {
        let mut summed = own_share.to_vec();
        for peer in peer_shares {
            summed = sum_share_vectors(&summed, peer)?;
        }
        return Ok(ShareResult::Intermediate(summed));
    }

    let mut per_node_shares: Vec<&[Share]> = Vec::with_capacity(peer_shares.len() + 1);
    per_node_shares.push(own_share);
    for peer in peer_shares {
        per_node_shares.push(peer);
    }
    let reconstructed = reconstruct_components(&per_node_shares)?;
    let stats = stats_template.from_field_vec(&reconstructed);
    let result = finalize(metadata.operation, &stats, metadata.target_percentile)?;
    Ok(ShareResult::Final(result))
}

fn sum_share_vectors(a: &[Share], b: &[Share]) -> Result<Vec<Share>> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput(
            "share vectors of differing component count cannot be summed".into(),
        ));
    }
    a.iter()
        .zip(b.iter())
        .map(|(sa, sb)| add_one(sa, sb))
        .collect()
}

fn add_one(a: &Share, b: &Share) -> Result<Share> {
    use crate::secret_sharing::{AdditiveSecretSharing, ReplicatedSecretSharing, ShamirSecretSharing};
    let sums = if a.x.is_some() {
        ShamirSecretSharing::add(std::slice::from_ref(a), std::slice::from_ref(b))?
    } else if a.metadata.replicated_components.is_some() {
        ReplicatedSecretSharing::add(std::slice::from_ref(a), std::slice::from_ref(b))?
    } else {
        AdditiveSecretSharing::add(std::slice::from_ref(a), std::slice::from_ref(b))?
    };
    Ok(sums.into_iter().next().unwrap())
}

/// Reconstructs one field element per component from `>= threshold`
/// distinct nodes' share vectors. `node_shares[k][i]` is node `k`'s
/// share of component `i`; every node vector must have the same
/// component count.
fn reconstruct_components(node_shares: &[&[Share]]) -> Result<Vec<FieldElement>> {
    if node_shares.is_empty() {
        return Err(Error::InsufficientShares {
            needed: 1,
            have: 0,
        });
    }
    let component_count = node_shares[0].len();
    (0..component_count)
        .map(|i| {
            let component_shares: Vec<Share> = node_shares
                .iter()
                .map(|node| node[i].clone())
                .collect();
            HybridSecretSharing::reconstruct(&component_shares)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinalResult {
    Scalar(f64),
    Pair(f64, f64),
    Vector(Vec<f64>),
}

impl FinalResult {
    pub fn approx_eq(&self, other: &FinalResult, tol: f64) -> bool {
        match (self, other) {
            (FinalResult::Scalar(a), FinalResult::Scalar(b)) => (a - b).abs() < tol,
            (FinalResult::Pair(a1, a2), FinalResult::Pair(b1, b2)) => {
                (a1 - b1).abs() < tol && (a2 - b2).abs() < tol
            }
            (FinalResult::Vector(a), FinalResult::Vector(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
            }
            _ => false,
        }
    }
}

fn safe_div(n: f64, d: f64) -> f64 {
    if d == 0.0 {
        0.0
    } else {
        n / d
    }
}

pub fn finalize(
    operation: Operation,
    stats: &SufficientStatistics,
    target_percentile: f64,
) -> Result<FinalResult> {
    match (operation, stats) {
        (Operation::Mean, SufficientStatistics::Mean { sum, n }) => {
            Ok(FinalResult::Scalar(safe_div(*sum, *n)))
        }
        (Operation::Variance, SufficientStatistics::VarianceLike { sum, sum_sq, n }) => {
            Ok(FinalResult::Scalar(population_variance(*sum, *sum_sq, *n)))
        }
        (Operation::StdDev, SufficientStatistics::VarianceLike { sum, sum_sq, n }) => {
            Ok(FinalResult::Scalar(
                population_variance(*sum, *sum_sq, *n).max(0.0).sqrt(),
            ))
        }
        (
            Operation::Correlation,
            SufficientStatistics::CorrelationLike {
                sum_x,
                sum_y,
                sum_xy,
                sum_x2,
                sum_y2,
                n,
            },
        ) => {
            let var_x = population_variance(*sum_x, *sum_x2, *n);
            let var_y = population_variance(*sum_y, *sum_y2, *n);
            let cov = safe_div(*sum_xy, *n) - safe_div(*sum_x, *n) * safe_div(*sum_y, *n);
            Ok(FinalResult::Scalar(safe_div(cov, (var_x * var_y).sqrt())))
        }
        (
            Operation::Covariance,
            SufficientStatistics::CorrelationLike {
                sum_x,
                sum_y,
                sum_xy,
                n,
                ..
            },
        ) => Ok(FinalResult::Scalar(
            safe_div(*sum_xy, *n) - safe_div(*sum_x, *n) * safe_div(*sum_y, *n),
        )),
        (
            Operation::LinearRegression,
            SufficientStatistics::LinearRegression {
                sum_x,
                sum_y,
                sum_xy,
                sum_x2,
                n,
            },
        ) => {
            let denom = n * sum_x2 - sum_x * sum_x;
            let slope = safe_div(n * sum_xy - sum_x * sum_y, denom);
            let intercept = safe_div(sum_y - slope * sum_x, *n);
            Ok(FinalResult::Pair(slope, intercept))
        }
        (
            Operation::Percentile | Operation::Median,
            SufficientStatistics::PercentileLike {
                histogram,
                min,
                max,
                n,
            },
        ) => {
            let p = if operation == Operation::Median {
                0.5
            } else {
                target_percentile
            };
            Ok(FinalResult::Scalar(estimate_percentile(
                histogram, *min, *max, *n, p,
            )))
        }
        (Operation::Min | Operation::Max, SufficientStatistics::Extreme { value }) => {
            Ok(FinalResult::Scalar(*value))
        }
        (Operation::PairedTTest, SufficientStatistics::PairedTTest { sum_d, sum_d2, n }) => {
            let mean_d = safe_div(*sum_d, *n);
            let var_d = population_variance(*sum_d, *sum_d2, *n);
            let t = safe_div(mean_d, safe_div(var_d, *n).sqrt());
            Ok(FinalResult::Pair(mean_d, t))
        }
        (
            Operation::IndependentTTest,
            SufficientStatistics::IndependentTTest {
                sum1,
                sum1_sq,
                n1,
                sum2,
                sum2_sq,
                n2,
            },
        ) => {
            let mean1 = safe_div(*sum1, *n1);
            let mean2 = safe_div(*sum2, *n2);
            let var1 = population_variance(*sum1, *sum1_sq, *n1);
            let var2 = population_variance(*sum2, *sum2_sq, *n2);
            let se = (safe_div(var1, *n1) + safe_div(var2, *n2)).sqrt();
            let t = safe_div(mean1 - mean2, se);
            Ok(FinalResult::Pair(mean1 - mean2, t))
        }
        (Operation::ChiSquare, SufficientStatistics::ChiSquare { terms }) => {
            Ok(FinalResult::Scalar(terms.iter().sum()))
        }
        (Operation::Histogram, SufficientStatistics::Histogram { counts }) => Ok(
            FinalResult::Vector(counts.iter().map(|c| c.max(0.0)).collect()),
        ),
        (op, _) => Err(Error::Internal(format!(
            "sufficient-statistics shape does not match operation {op:?}"
        ))),
    }
}

fn population_variance(sum: f64, sum_sq: f64, n: f64) -> f64 {
    let mean = safe_div(sum, n);
    safe_div(sum_sq, n) - mean * mean
}

fn estimate_percentile(histogram: &[f64], min: f64, max: f64, n: f64, p: f64) -> f64 {
    let clamped: Vec<f64> = histogram.iter().map(|c| c.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();
    if total <= 0.0 || n <= 0.0 || clamped.is_empty() {
        return min;
    }
    let bucket_width = (max - min) / clamped.len() as f64;
    let target = total * p;
    let mut cumulative = 0.0;
    for (i, count) in clamped.iter().enumerate() {
        let next = cumulative + count;
        if next >= target {
            let within = if *count > 0.0 {
                (target - cumulative) / count
            } else {
                0.0
            };
            return min + bucket_width * (i as f64 + within);
        }
        cumulative = next;
    }
    max
}

/// Node-reported outcome feeding `aggregate_results`/`verify_result`:
/// either unreduced summed shares plus the owner's local count (for
/// ratio-statistic weighting), or an already-finalized per-node result.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Shares(Vec<Share>, f64),
    Final(FinalResult, f64),
}

/// `aggregate_results`: weights by count for ratio statistics when
/// nodes reported final per-node averages; otherwise sums the relayed
/// shares and applies the final function once.
pub fn aggregate_results(
    per_node_results: &[NodeOutcome],
    operation: Operation,
    stats_template: &SufficientStatistics,
    target_percentile: f64,
) -> Result<FinalResult> {
    if per_node_results.is_empty() {
        return Err(Error::InsufficientNodes {
            needed: 1,
            have: 0,
        });
    }

    let all_final = per_node_results
        .iter()
        .all(|r| matches!(r, NodeOutcome::Final(..)));

    if all_final && operation.is_ratio_statistic() {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for r in per_node_results {
            if let NodeOutcome::Final(FinalResult::Scalar(v), weight) = r {
                weighted += v * weight;
                total_weight += weight;
            } else {
                return Err(Error::Internal(
                    "mixed final-result shapes cannot be weight-averaged".into(),
                ));
            }
        }
        return Ok(FinalResult::Scalar(safe_div(weighted, total_weight)));
    }

    let mut per_node_shares: Vec<&[Share]> = Vec::with_capacity(per_node_results.len());
    for r in per_node_results {
        match r {
            NodeOutcome::Shares(s, _) => per_node_shares.push(s),
            NodeOutcome::Final(_, _) => {
                return Err(Error::Internal(
                    "cannot mix finalized and unfinalized node results".into(),
                ))
            }
        };
    }
    let reconstructed = reconstruct_components(&per_node_shares)?;
    let stats = stats_template.from_field_vec(&reconstructed);
    finalize(operation, &stats, target_percentile)
}

/// Recomputes the result independently and compares within `1e-9`
/// (component-wise for vector results).
pub fn verify_result(
    result: &FinalResult,
    per_node_results: &[NodeOutcome],
    operation: Operation,
    stats_template: &SufficientStatistics,
    target_percentile: f64,
) -> Result<bool> {
    let recomputed = aggregate_results(per_node_results, operation, stats_template, target_percentile)?;
    Ok(result.approx_eq(&recomputed, 1e-9))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn local_mean_stats(data: &[f64]) -> SufficientStatistics {
        SufficientStatistics::Mean {
            sum: data.iter().sum(),
            n: data.len() as f64,
        }
    }

    fn negligible_noise_params() -> PrivacyParameters {
        PrivacyParameters::new(1e9, 1e-6, 1e-6, NoiseMechanism::Laplace)
    }

    /// Spec §8 end-to-end scenario 1: three owner-nodes, mean over
    /// [10,20,30] / [15,25,35] / [5,15,25], threshold 2 of 3, epsilon
    /// large enough that noise is negligible. Expected mean 20.0, count 9.
    #[test]
    fn mean_over_three_owner_nodes_matches_scenario_one() {
        let node_ids = vec!["n1".to_string(), "n2".to_string(), "n3".to_string()];
        let owners_data = [
            vec![10.0, 20.0, 30.0],
            vec![15.0, 25.0, 35.0],
            vec![5.0, 15.0, 25.0],
        ];
        let params = negligible_noise_params();

        // Each owner-node deals its local noisy stats to every node.
        let mut dealt: Vec<PreparedData> = Vec::new();
        for data in &owners_data {
            let stats = local_mean_stats(data);
            let prepared =
                prepare_data(&stats, Operation::Mean, &node_ids, &params, false, None).unwrap();
            dealt.push(prepared);
        }

        let metadata_intermediate = dealt[0].metadata.clone_with_final(false);
        // Every node sums what it dealt to itself with what it received
        // from the other two owner-nodes into its own node-total share.
        let mut node_totals: HashMap<String, Vec<Share>> = HashMap::new();
        for (owner_idx, node_id) in node_ids.iter().enumerate() {
            let own_share = dealt[owner_idx].shares_per_node[node_id].clone();
            let peer_shares: Vec<Vec<Share>> = node_ids
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != owner_idx)
                .map(|(i, _)| dealt[i].shares_per_node[node_id].clone())
                .collect();
            let result = process_share_at_node(
                &own_share,
                &peer_shares,
                &local_mean_stats(&owners_data[0]),
                &metadata_intermediate,
            )
            .unwrap();
            match result {
                ShareResult::Intermediate(shares) => {
                    node_totals.insert(node_id.clone(), shares);
                }
                ShareResult::Final(_) => panic!("expected an intermediate result"),
            }
        }

        // Aggregator n1 collects n2's node-total (threshold = 2) and
        // reconstructs the combined statistic.
        let metadata_final = dealt[0].metadata.clone_with_final(true);
        let result = process_share_at_node(
            &node_totals["n1"],
            &[node_totals["n2"].clone()],
            &local_mean_stats(&owners_data[0]),
            &metadata_final,
        )
        .unwrap();

        match result {
            ShareResult::Final(FinalResult::Scalar(mean)) => {
                assert!((mean - 20.0).abs() < 1e-6, "mean was {mean}");
            }
            _ => panic!("expected a final scalar result"),
        }
    }

    #[test]
    fn correlation_rejects_mismatched_dimensions() {
        // Spec §8 scenario 2: x has 3 points, y has 2.
        let err = crate::protocol::reduce::correlation_from_raw(&[1.0, 2.0, 3.0], &[1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn safe_div_by_zero_count_yields_zero() {
        assert_eq!(safe_div(5.0, 0.0), 0.0);
    }

    #[test]
    fn empty_percentile_histogram_falls_back_to_min() {
        let v = estimate_percentile(&[], 3.0, 9.0, 0.0, 0.5);
        assert_eq!(v, 3.0);
    }

    #[test]
    fn histogram_clamps_negative_noisy_counts() {
        let stats = SufficientStatistics::Histogram {
            counts: vec![5.0, -2.0, 3.0],
        };
        let result = finalize(Operation::Histogram, &stats, 0.5).unwrap();
        assert_eq!(result, FinalResult::Vector(vec![5.0, 0.0, 3.0]));
    }

    #[test]
    fn aggregate_results_weights_ratio_statistics_by_count_when_final() {
        let per_node = vec![
            NodeOutcome::Final(FinalResult::Scalar(10.0), 3.0),
            NodeOutcome::Final(FinalResult::Scalar(20.0), 1.0),
        ];
        let template = SufficientStatistics::Mean { sum: 0.0, n: 0.0 };
        let result = aggregate_results(&per_node, Operation::Mean, &template, 0.5).unwrap();
        match result {
            FinalResult::Scalar(v) => assert!((v - 12.5).abs() < 1e-9),
            _ => panic!("expected scalar"),
        }
    }
}
