//! Additive secret sharing: the secret is the sum of `n` shares mod p.
//! Threshold always equals `n`, every share is required to reconstruct.

use crate::error::{Error, Result};
use crate::field::FieldElement;

use super::share::{Share, ShareMetadata, ShareScheme};

pub struct AdditiveSecretSharing;

impl AdditiveSecretSharing {
    pub fn share(secret: FieldElement, n: usize) -> Result<Vec<Share>> {
        if n == 0 {
            return Err(Error::InvalidThreshold("n must be >= 1".into()));
        }
        let mut shares = Vec::with_capacity(n);
        let mut running_sum = FieldElement::ZERO;
        for i in 0..n - 1 {
            let v = FieldElement::random();
            running_sum = running_sum + v;
            shares.push(Share {
                index: (i + 1) as u32,
                x: None,
                value: v,
                scheme: ShareScheme::Additive,
                threshold: n as u32,
                metadata: ShareMetadata::default(),
                verification: None,
            });
        }
        let last = secret - running_sum;
        shares.push(Share {
            index: n as u32,
            x: None,
            value: last,
            scheme: ShareScheme::Additive,
            threshold: n as u32,
            metadata: ShareMetadata::default(),
            verification: None,
        });
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
        Ok(shares.iter().fold(FieldElement::ZERO, |acc, s| acc + s.value))
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
                Ok(Share {
                    index: sa.index,
                    x: None,
                    value: sa.value + sb.value,
                    scheme: ShareScheme::Additive,
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
                x: None,
                value: s.value * k,
                scheme: ShareScheme::Additive,
                threshold: s.threshold,
                metadata: ShareMetadata::default(),
                verification: None,
            })
            .collect()
    }
}
