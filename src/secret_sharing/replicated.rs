//! Replicated secret sharing (a.k.a. CNF sharing) for general `(t, n)`.
//!
//! The secret is split into one random component per `(t-1)`-subset of
//! parties; party `p` is given every component except the ones keyed by
//! a subset containing `p`. Any `t` parties then collectively hold every
//! component (no `(t-1)`-subset can contain `t` distinct parties), so
//! their union sums to the secret; any `t-1` parties are collectively
//! missing exactly the component keyed by themselves, which is
//! information-theoretically hidden.
//!
//! This generalizes the common 3-party special case (`t = 2, n = 3`:
//! each party excludes exactly one of three random shares) to arbitrary
//! thresholds, replacing a fixed-index exclusion rule that only
//! distributes correctly in that special case, see `DESIGN.md`'s Open
//! Question on replicated sharing.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::field::FieldElement;

use super::share::{Share, ShareMetadata, ShareScheme};

type Subset = Vec<u32>;

fn combinations(n: usize, k: usize) -> Vec<Subset> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if k > n {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut current = Vec::with_capacity(k);
    fn recurse(start: u32, n: u32, k: usize, current: &mut Subset, out: &mut Vec<Subset>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        let remaining_needed = k - current.len();
        for p in start..=n {
            if (n - p + 1) < remaining_needed as u32 {
                break;
            }
            current.push(p);
            recurse(p + 1, n, k, current, out);
            current.pop();
        }
    }
    recurse(1, n as u32, k, &mut current, &mut result);
    result
}

pub struct ReplicatedSecretSharing;

impl ReplicatedSecretSharing {
    pub fn share(secret: FieldElement, n: usize, threshold: usize) -> Result<Vec<Share>> {
        if threshold == 0 || threshold > n {
            return Err(Error::InvalidThreshold(format!(
                "threshold {threshold} must be in 1..={n}"
            )));
        }
        let subsets = combinations(n, threshold - 1);
        let mut values: HashMap<Subset, FieldElement> = HashMap::with_capacity(subsets.len());
        let mut running = FieldElement::ZERO;
        for (i, subset) in subsets.iter().enumerate() {
            if i + 1 == subsets.len() {
                values.insert(subset.clone(), secret - running);
            } else {
                let v = FieldElement::random();
                running = running + v;
                values.insert(subset.clone(), v);
            }
        }

        let mut shares = Vec::with_capacity(n);
        for party in 1..=n as u32 {
            let held: Vec<(Subset, FieldElement)> = subsets
                .iter()
                .filter(|s| !s.contains(&party))
                .map(|s| (s.clone(), values[s]))
                .collect();
            let local_value = held
                .iter()
                .fold(FieldElement::ZERO, |acc, (_, v)| acc + *v);
            shares.push(Share {
                index: party,
                x: None,
                value: local_value,
                scheme: ShareScheme::Replicated,
                threshold: threshold as u32,
                metadata: ShareMetadata {
                    replicated_components: Some(held),
                    ..Default::default()
                },
                verification: None,
            });
        }
        Ok(shares)
    }

    pub fn reconstruct(shares: &[Share]) -> Result<FieldElement> {
        if shares.is_empty() {
            return Err(Error::InsufficientShares { needed: 1, have: 0 });
        }
        let threshold = shares[0].threshold as usize;
        if shares.len() < threshold {
            return Err(Error::InsufficientShares {
                needed: threshold,
                have: shares.len(),
            });
        }
        for s in shares {
            if !s.verify() {
                return Err(Error::CommitmentMismatch { index: s.index });
            }
        }

        let mut distinct: HashMap<Subset, FieldElement> = HashMap::new();
        for s in shares {
            let comps = s.metadata.replicated_components.as_ref().ok_or_else(|| {
                Error::InvalidInput("replicated share is missing its components".into())
            })?;
            for (subset, value) in comps {
                distinct.entry(subset.clone()).or_insert(*value);
            }
        }
        Ok(distinct.values().fold(FieldElement::ZERO, |acc, v| acc + *v))
    }

    pub fn add(a: &[Share], b: &[Share]) -> Result<Vec<Share>> {
        if a.len() != b.len() {
            return Err(Error::InvalidInput(
                "share vectors must have equal length to add".into(),
            ));
        }
        a.iter()
            .zip(b.iter())
            .map(|(sa, sb)| {
                if sa.index != sb.index || sa.threshold != sb.threshold {
                    return Err(Error::InvalidInput(
                        "mismatched share index or threshold".into(),
                    ));
                }
                let ca = sa.metadata.replicated_components.as_ref().ok_or_else(|| {
                    Error::InvalidInput("replicated share is missing its components".into())
                })?;
                let cb = sb.metadata.replicated_components.as_ref().ok_or_else(|| {
                    Error::InvalidInput("replicated share is missing its components".into())
                })?;
                if ca.len() != cb.len() {
                    return Err(Error::InvalidInput(
                        "replicated shares were built with different (n, t)".into(),
                    ));
                }
                let summed: Vec<(Subset, FieldElement)> = ca
                    .iter()
                    .zip(cb.iter())
                    .map(|((ka, va), (_, vb))| (ka.clone(), *va + *vb))
                    .collect();
                let local_value = summed
                    .iter()
                    .fold(FieldElement::ZERO, |acc, (_, v)| acc + *v);
                Ok(Share {
                    index: sa.index,
                    x: None,
                    value: local_value,
                    scheme: ShareScheme::Replicated,
                    threshold: sa.threshold,
                    metadata: ShareMetadata {
                        replicated_components: Some(summed),
                        ..Default::default()
                    },
                    verification: None,
                })
            })
            .collect()
    }

    pub fn scale(shares: &[Share], k: FieldElement) -> Result<Vec<Share>> {
        shares
            .iter()
            .map(|s| {
                let comps = s.metadata.replicated_components.as_ref().ok_or_else(|| {
                    Error::InvalidInput("replicated share is missing its components".into())
                })?;
                let scaled: Vec<(Subset, FieldElement)> =
                    comps.iter().map(|(key, v)| (key.clone(), *v * k)).collect();
                Ok(Share {
                    index: s.index,
                    x: None,
                    value: s.value * k,
                    scheme: ShareScheme::Replicated,
                    threshold: s.threshold,
                    metadata: ShareMetadata {
                        replicated_components: Some(scaled),
                        ..Default::default()
                    },
                    verification: None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_party_two_threshold_matches_special_case() {
        let secret = FieldElement::new(77);
        let shares = ReplicatedSecretSharing::share(secret, 3, 2).unwrap();
        assert_eq!(shares.len(), 3);
        // each party holds exactly one of the two distinct components
        for s in &shares {
            assert_eq!(s.metadata.replicated_components.as_ref().unwrap().len(), 2);
        }
        let reconstructed = ReplicatedSecretSharing::reconstruct(&shares[0..2]).unwrap();
        assert_eq!(reconstructed, secret);
    }

    #[test]
    fn general_threshold_reconstructs() {
        let secret = FieldElement::new(123);
        let shares = ReplicatedSecretSharing::share(secret, 5, 3).unwrap();
        let reconstructed = ReplicatedSecretSharing::reconstruct(&shares[1..4]).unwrap();
        assert_eq!(reconstructed, secret);
    }

    #[test]
    fn fewer_than_threshold_is_rejected() {
        let secret = FieldElement::new(5);
        let shares = ReplicatedSecretSharing::share(secret, 4, 3).unwrap();
        let err = ReplicatedSecretSharing::reconstruct(&shares[0..2]).unwrap_err();
        assert!(matches!(err, Error::InsufficientShares { needed: 3, have: 2 }));
    }

    #[test]
    fn homomorphic_addition() {
        let a = ReplicatedSecretSharing::share(FieldElement::new(10), 4, 2).unwrap();
        let b = ReplicatedSecretSharing::share(FieldElement::new(32), 4, 2).unwrap();
        let sum = ReplicatedSecretSharing::add(&a, &b).unwrap();
        let reconstructed = ReplicatedSecretSharing::reconstruct(&sum[0..2]).unwrap();
        assert_eq!(reconstructed, FieldElement::new(42));
    }

    #[test]
    fn threshold_equal_to_n_requires_everyone() {
        let secret = FieldElement::new(9);
        let shares = ReplicatedSecretSharing::share(secret, 3, 3).unwrap();
        assert_eq!(
            ReplicatedSecretSharing::reconstruct(&shares).unwrap(),
            secret
        );
    }
}
