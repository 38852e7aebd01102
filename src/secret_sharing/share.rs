//! The uniform share envelope shared by all four schemes in this module.
//!
//! A [`Share`] never crosses a process boundary without its
//! [`ShareVerification`] when verifiable sharing is enabled for the
//! computation it belongs to (data-model invariant, see spec §3).

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::field::FieldElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareScheme {
    Shamir,
    Additive,
    Replicated,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentAlgorithm {
    Poseidon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareVerification {
    pub commitment: FieldElement,
    pub salt: FieldElement,
    pub algorithm: CommitmentAlgorithm,
}

impl ShareVerification {
    pub fn new(value: FieldElement) -> Self {
        let c = Commitment::commit(value);
        ShareVerification {
            commitment: c.commitment,
            salt: c.blinding,
            algorithm: CommitmentAlgorithm::Poseidon,
        }
    }

    pub fn matches(&self, value: FieldElement) -> bool {
        let c = Commitment::commit_with_blinding(value, self.salt);
        c.commitment == self.commitment
    }
}

/// Replicated sharing assigns each party a subset of the scheme's
/// distinct random components, keyed by which `(t-1)`-subset of parties
/// is excluded from seeing it (see [`crate::secret_sharing::replicated`]).
/// Carried here rather than as a separate share type so every scheme can
/// flow through the same `Share` envelope; `None` for every other scheme.
pub type ReplicatedComponents = Vec<(Vec<u32>, FieldElement)>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareMetadata {
    pub computation_id: Option<String>,
    pub label: Option<String>,
    pub replicated_components: Option<ReplicatedComponents>,
    /// The second bivariate component for the hybrid scheme's `t = 2`
    /// case, where each party holds `(v1, v2)` with `v1 + v2 = secret`.
    pub bivariate_second: Option<FieldElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Share {
    pub index: u32,
    /// Present only for polynomial-interpolation schemes (Shamir, and
    /// Hybrid when it falls back to Shamir).
    pub x: Option<FieldElement>,
    pub value: FieldElement,
    pub scheme: ShareScheme,
    pub threshold: u32,
    pub metadata: ShareMetadata,
    pub verification: Option<ShareVerification>,
}

impl Share {
    pub fn attach_verification(&mut self) {
        self.verification = Some(ShareVerification::new(self.value));
    }

    /// Computes every share's Poseidon commitment concurrently over
    /// `rayon`'s pool before assigning them back, rather than hashing
    /// one value at a time; each commitment is independent of the
    /// others, so there's nothing to serialize.
    pub fn attach_verification_batch(shares: &mut [Share]) {
        let verifications: Vec<ShareVerification> =
            shares.par_iter().map(|s| ShareVerification::new(s.value)).collect();
        for (share, verification) in shares.iter_mut().zip(verifications) {
            share.verification = Some(verification);
        }
    }

    /// `true` if verification is absent (nothing to check) or present
    /// and matching; `false` only on an actual mismatch.
    pub fn verify(&self) -> bool {
        match &self.verification {
            None => true,
            Some(v) => v.matches(self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_share(value: u64) -> Share {
        Share {
            index: 1,
            x: Some(FieldElement::new(1)),
            value: FieldElement::new(value),
            scheme: ShareScheme::Shamir,
            threshold: 2,
            metadata: ShareMetadata::default(),
            verification: None,
        }
    }

    #[test]
    fn batch_verification_matches_one_at_a_time() {
        let mut batched = vec![bare_share(1), bare_share(2), bare_share(3)];
        Share::attach_verification_batch(&mut batched);
        for s in &batched {
            assert!(s.verify());
        }

        let mut sequential = bare_share(7);
        sequential.attach_verification();
        assert!(sequential.verify());
    }

    #[test]
    fn batch_verification_still_catches_tampering() {
        let mut shares = vec![bare_share(10), bare_share(20)];
        Share::attach_verification_batch(&mut shares);
        shares[0].value = shares[0].value + FieldElement::ONE;
        assert!(!shares[0].verify());
        assert!(shares[1].verify());
    }
}
