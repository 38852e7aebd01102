//! Hybrid scheme selector: picks the cheapest scheme that fits `(n, t)`,
//! evaluated in this fixed priority order (spec's scheme-selection
//! table):
//!
//! 1. `n <= 10` → Shamir (small committees: polynomial overhead is cheap
//!    and Shamir's reconstruction-from-any-t-subset is the most
//!    flexible).
//! 2. `t == n` → Additive (every party is required anyway, so a plain
//!    sum is strictly cheaper than a polynomial).
//! 3. `t == 2` → "bivariate": this spec resolves `t = 2` to the general
//!    replicated (CNF) construction at threshold 2. A literal
//!    two-scalar-per-party encoding (`v1_i + v2_i = secret`) only
//!    satisfies "any 2 of n parties reconstruct" when `n = 3`; for
//!    larger `n` it cannot, since a fixed pair per party doesn't cover
//!    every 2-subset. The replicated construction *is* exactly that
//!    pair encoding at `n = 3` and generalizes correctly beyond it, so
//!    it is the faithful reading of "bivariate" that keeps the
//!    threshold-safety invariant true for every `n`. See `DESIGN.md`.
//! 4. otherwise → Shamir.

use crate::error::Result;
use crate::field::FieldElement;

use super::additive::AdditiveSecretSharing;
use super::replicated::ReplicatedSecretSharing;
use super::shamir::ShamirSecretSharing;
use super::share::{Share, ShareScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridChoice {
    Shamir,
    Additive,
    ReplicatedBivariate,
}

pub fn choose(n: usize, threshold: usize) -> HybridChoice {
    if n <= 10 {
        HybridChoice::Shamir
    } else if threshold == n {
        HybridChoice::Additive
    } else if threshold == 2 {
        HybridChoice::ReplicatedBivariate
    } else {
        HybridChoice::Shamir
    }
}

pub struct HybridSecretSharing;

impl HybridSecretSharing {
    pub fn share(secret: FieldElement, n: usize, threshold: usize) -> Result<Vec<Share>> {
        let mut shares = match choose(n, threshold) {
            HybridChoice::Shamir => ShamirSecretSharing::share(secret, n, threshold)?,
            HybridChoice::Additive => AdditiveSecretSharing::share(secret, n)?,
            HybridChoice::ReplicatedBivariate => {
                ReplicatedSecretSharing::share(secret, n, threshold)?
            }
        };
        for s in &mut shares {
            s.scheme = ShareScheme::Hybrid;
        }
        Ok(shares)
    }

    /// Reconstruction dispatches on the scheme actually used, which is
    /// recoverable from the share shape: `x.is_some()` means Shamir ran;
    /// `replicated_components` present means the CNF branch ran;
    /// otherwise it was a plain additive split.
    pub fn reconstruct(shares: &[Share]) -> Result<FieldElement> {
        if shares.first().map(|s| s.x.is_some()).unwrap_or(false) {
            ShamirSecretSharing::reconstruct(shares)
        } else if shares
            .first()
            .map(|s| s.metadata.replicated_components.is_some())
            .unwrap_or(false)
        {
            ReplicatedSecretSharing::reconstruct(shares)
        } else {
            AdditiveSecretSharing::reconstruct(shares)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_n_always_picks_shamir() {
        assert_eq!(choose(10, 2), HybridChoice::Shamir);
        assert_eq!(choose(3, 3), HybridChoice::Shamir);
    }

    #[test]
    fn full_threshold_beyond_ten_picks_additive() {
        assert_eq!(choose(11, 11), HybridChoice::Additive);
    }

    #[test]
    fn pairwise_threshold_beyond_ten_picks_replicated() {
        assert_eq!(choose(15, 2), HybridChoice::ReplicatedBivariate);
    }

    #[test]
    fn otherwise_falls_back_to_shamir() {
        assert_eq!(choose(12, 5), HybridChoice::Shamir);
    }

    #[test]
    fn round_trips_through_the_selected_branch() {
        let secret = FieldElement::new(4242);
        let shares = HybridSecretSharing::share(secret, 15, 2).unwrap();
        let reconstructed = HybridSecretSharing::reconstruct(&shares[0..2]).unwrap();
        assert_eq!(reconstructed, secret);

        let shares = HybridSecretSharing::share(secret, 11, 11).unwrap();
        let reconstructed = HybridSecretSharing::reconstruct(&shares).unwrap();
        assert_eq!(reconstructed, secret);

        let shares = HybridSecretSharing::share(secret, 5, 3).unwrap();
        let reconstructed = HybridSecretSharing::reconstruct(&shares[0..3]).unwrap();
        assert_eq!(reconstructed, secret);
    }
}
