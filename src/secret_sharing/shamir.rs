//! Shamir's (t, n)-threshold secret sharing over [`FieldElement`].
//!
//! The secret is the constant term of a random degree-`(t-1)` polynomial;
//! shares are evaluations at `x = 1..=n`; reconstruction is Lagrange
//! interpolation at `x = 0`. Any `t` shares determine the polynomial
//! uniquely; fewer than `t` leave the constant term uniformly
//! distributed over the field.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::field::FieldElement;

use super::share::{Share, ShareMetadata, ShareScheme};

pub struct ShamirSecretSharing;

impl ShamirSecretSharing {
    fn evaluate(coefficients: &[FieldElement], x: FieldElement) -> FieldElement {
        let mut result = FieldElement::ZERO;
        let mut x_power = FieldElement::ONE;
        for &coeff in coefficients {
            result = result + coeff * x_power;
            x_power = x_power * x;
        }
        result
    }

    pub fn share(secret: FieldElement, n: usize, threshold: usize) -> Result<Vec<Share>> {
        if threshold == 0 || threshold > n {
            return Err(Error::InvalidThreshold(format!(
                "threshold {threshold} must be in 1..={n}"
            )));
        }
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret);
        for _ in 1..threshold {
            coefficients.push(FieldElement::random());
        }

        let mut shares = Vec::with_capacity(n);
        for i in 1..=n {
            let x = FieldElement::new(i as u64);
            let y = Self::evaluate(&coefficients, x);
            shares.push(Share {
                index: i as u32,
                x: Some(x),
                value: y,
                scheme: ShareScheme::Shamir,
                threshold: threshold as u32,
                metadata: ShareMetadata::default(),
                verification: None,
            });
        }
        Ok(shares)
    }

    pub fn reconstruct(shares: &[Share]) -> Result<FieldElement> {
        if shares.is_empty() {
            return Err(Error::InsufficientShares {
                needed: 1,
                have: 0,
            });
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

        // Each Lagrange term only reads `subset`, so the per-index work
        // (an O(threshold) product to build that index's coefficient)
        // is independent and fans out over `rayon`'s global pool rather
        // than running index-by-index.
        let subset = &shares[..threshold];
        let terms: Result<Vec<FieldElement>> = (0..subset.len())
            .into_par_iter()
            .map(|i| {
                let xi = subset[i]
                    .x
                    .ok_or_else(|| Error::Internal("Shamir share missing x coordinate".into()))?;
                let mut numerator = FieldElement::ONE;
                let mut denominator = FieldElement::ONE;
                for j in 0..subset.len() {
                    if i == j {
                        continue;
                    }
                    let xj = subset[j]
                        .x
                        .ok_or_else(|| Error::Internal("Shamir share missing x coordinate".into()))?;
                    numerator = numerator * (FieldElement::ZERO - xj);
                    denominator = denominator * (xi - xj);
                }
                let denom_inv = denominator
                    .inv()
                    .ok_or_else(|| Error::CryptographicError("no modular inverse exists".into()))?;
                Ok(subset[i].value * (numerator * denom_inv))
            })
            .collect();
        Ok(terms?.into_iter().fold(FieldElement::ZERO, |acc, term| acc + term))
    }

    /// Share-wise modular addition. Requires equal length, matching `x`
    /// coordinates and equal threshold; preserves the threshold.
    pub fn add(a: &[Share], b: &[Share]) -> Result<Vec<Share>> {
        if a.len() != b.len() {
            return Err(Error::InvalidInput(
                "share vectors must have equal length to add".into(),
            ));
        }
        a.iter()
            .zip(b.iter())
            .map(|(sa, sb)| {
                if sa.x != sb.x || sa.threshold != sb.threshold {
                    return Err(Error::InvalidInput(
                        "mismatched share coordinates or threshold".into(),
                    ));
                }
                Ok(Share {
                    index: sa.index,
                    x: sa.x,
                    value: sa.value + sb.value,
                    scheme: ShareScheme::Shamir,
                    threshold: sa.threshold,
                    metadata: ShareMetadata::default(),
                    verification: None,
                })
            })
            .collect()
    }

    pub fn scale(shares: &[Share], k: FieldElement) -> Vec<Share> {
        shares
            .iter()
            .map(|s| Share {
                index: s.index,
                x: s.x,
                value: s.value * k,
                scheme: ShareScheme::Shamir,
                threshold: s.threshold,
                metadata: ShareMetadata::default(),
                verification: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructs_with_exactly_threshold_shares() {
        let secret = FieldElement::new(42);
        let shares = ShamirSecretSharing::share(secret, 5, 3).unwrap();
        let reconstructed = ShamirSecretSharing::reconstruct(&shares[0..3]).unwrap();
        assert_eq!(reconstructed, secret);
    }

    #[test]
    fn fails_with_insufficient_shares() {
        let secret = FieldElement::new(42);
        let shares = ShamirSecretSharing::share(secret, 5, 3).unwrap();
        let err = ShamirSecretSharing::reconstruct(&shares[0..2]).unwrap_err();
        assert!(matches!(err, Error::InsufficientShares { needed: 3, have: 2 }));
    }

    #[test]
    fn homomorphic_addition_preserves_threshold() {
        let a = ShamirSecretSharing::share(FieldElement::new(10), 4, 2).unwrap();
        let b = ShamirSecretSharing::share(FieldElement::new(20), 4, 2).unwrap();
        let sum = ShamirSecretSharing::add(&a, &b).unwrap();
        let reconstructed = ShamirSecretSharing::reconstruct(&sum[0..2]).unwrap();
        assert_eq!(reconstructed, FieldElement::new(30));
    }

    #[test]
    fn scalar_multiplication() {
        let shares = ShamirSecretSharing::share(FieldElement::new(6), 4, 2).unwrap();
        let scaled = ShamirSecretSharing::scale(&shares, FieldElement::new(7));
        let reconstructed = ShamirSecretSharing::reconstruct(&scaled[0..2]).unwrap();
        assert_eq!(reconstructed, FieldElement::new(42));
    }

    #[test]
    fn tampering_a_verified_share_breaks_reconstruction() {
        let secret = FieldElement::new(99);
        let mut shares = ShamirSecretSharing::share(secret, 4, 2).unwrap();
        for s in &mut shares {
            s.attach_verification();
        }
        shares[0].value = shares[0].value + FieldElement::ONE;
        let err = ShamirSecretSharing::reconstruct(&shares[0..2]).unwrap_err();
        assert!(matches!(err, Error::CommitmentMismatch { .. }));
    }

    #[test]
    fn rejects_invalid_threshold() {
        assert!(ShamirSecretSharing::share(FieldElement::new(1), 3, 0).is_err());
        assert!(ShamirSecretSharing::share(FieldElement::new(1), 3, 4).is_err());
    }
}
