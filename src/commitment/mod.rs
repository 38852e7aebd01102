//! Pedersen-style commitment: `commit(v) = { commitment, blinding }`
//! where `commitment = H(v, blinding)` and `blinding` is drawn from the
//! same CSPRNG as every other privacy-relevant random value in this
//! crate (see [`crate::field::FieldElement::random`]).
//!
//! Hiding follows from `blinding` being uniformly random and independent
//! of `v`; binding follows from the collision resistance of the
//! underlying Poseidon sponge ([`crate::hash::poseidon`]).

use serde::{Deserialize, Serialize};

use crate::field::FieldElement;
use crate::hash::hash2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub commitment: FieldElement,
    pub blinding: FieldElement,
}

impl Commitment {
    /// Commits to `value` with a fresh random blinding factor.
    pub fn commit(value: FieldElement) -> Self {
        let blinding = FieldElement::random();
        Commitment {
            commitment: hash2(value, blinding),
            blinding,
        }
    }

    /// Commits to `value` with a caller-supplied blinding factor. Used
    /// when the blinding factor must be reproducible (e.g. the salt
    /// carried alongside a secret share, see
    /// [`crate::secret_sharing::ShareVerification`]).
    pub fn commit_with_blinding(value: FieldElement, blinding: FieldElement) -> Self {
        Commitment {
            commitment: hash2(value, blinding),
            blinding,
        }
    }

    pub fn verify(&self, value: FieldElement) -> bool {
        hash2(value, self.blinding) == self.commitment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_opening() {
        let value = FieldElement::new(42);
        let c = Commitment::commit(value);
        assert!(c.verify(value));
    }

    #[test]
    fn rejects_tampered_value() {
        let value = FieldElement::new(42);
        let c = Commitment::commit(value);
        assert!(!c.verify(FieldElement::new(43)));
    }

    #[test]
    fn hiding_blinding_varies_commitment() {
        let value = FieldElement::new(7);
        let c1 = Commitment::commit(value);
        let c2 = Commitment::commit(value);
        assert_ne!(c1.commitment, c2.commitment);
    }
}
