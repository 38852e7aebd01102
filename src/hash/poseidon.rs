//! A ZK-friendly hash built on the `poseidon2` permutation over the
//! BN254 scalar field, wrapped into a sponge so it accepts the crate's
//! own field elements (Goldilocks, see [`crate::field`]) at the widths
//! the protocol engine and commitment scheme need: 2, 3, 4, 6 and
//! variable-length input.
//!
//! The permutation itself (`poseidon2::bn254::t4::permutation`, state
//! width 4 / rate 3 / capacity 1) only ever runs over BN254 field
//! elements; [`to_bn254`]/[`from_bn254`] are the boundary conversions.
//! Fixed-width entry points are cached behind [`DOMAIN_TAGS`] so repeated
//! calls at the same width don't re-derive their domain separator.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use lazy_static::lazy_static;

use crate::field::{FieldElement, FIELD_PRIME};

const RATE: usize = 3;

lazy_static! {
    /// Per-width domain separators, so a width-2 call and a width-6 call
    /// over the same prefix of inputs never collide on the same sponge
    /// output. Indexed by width for 2/3/4/6; variable-width hashing uses
    /// `DOMAIN_TAGS[4]` plus the true input length mixed in.
    static ref DOMAIN_TAGS: [Fr; 5] = [
        Fr::from(0x504f5332u64), // "POS2" + width 2
        Fr::from(0x504f5333u64), // width 3
        Fr::from(0x504f5334u64), // width 4
        Fr::from(0x504f5336u64), // width 6
        Fr::from(0x504f5356u64), // "POSV" variable
    ];
}

fn to_bn254(fe: FieldElement) -> Fr {
    Fr::from(fe.value())
}

fn from_bn254(fr: Fr) -> FieldElement {
    let bytes = fr.into_bigint().to_bytes_le();
    let mut acc: u128 = 0;
    for &b in bytes.iter().rev() {
        acc = ((acc << 8) | b as u128) % FIELD_PRIME as u128;
    }
    FieldElement::new(acc as u64)
}

/// Absorbs `inputs` (prefixed by `domain_tag`) through the width-4
/// permutation in blocks of [`RATE`], squeezing a single output element.
fn sponge(domain_tag: Fr, inputs: &[FieldElement]) -> FieldElement {
    let mut state = [Fr::from(0u64), Fr::from(0u64), Fr::from(0u64), domain_tag];
    let mut chunks = inputs.chunks(RATE).peekable();
    if chunks.peek().is_none() {
        // Nothing to absorb beyond the domain tag; still run one
        // permutation so an empty input doesn't degenerate to a
        // constant-zero hash.
        state = poseidon2::bn254::t4::permutation(&state);
    }
    for chunk in chunks {
        for (i, value) in chunk.iter().enumerate() {
            state[i] = state[i] + to_bn254(*value);
        }
        state = poseidon2::bn254::t4::permutation(&state);
    }
    from_bn254(state[0])
}

pub fn hash2(a: FieldElement, b: FieldElement) -> FieldElement {
    sponge(DOMAIN_TAGS[0], &[a, b])
}

pub fn hash3(a: FieldElement, b: FieldElement, c: FieldElement) -> FieldElement {
    sponge(DOMAIN_TAGS[1], &[a, b, c])
}

pub fn hash4(a: FieldElement, b: FieldElement, c: FieldElement, d: FieldElement) -> FieldElement {
    sponge(DOMAIN_TAGS[2], &[a, b, c, d])
}

pub fn hash6(inputs: [FieldElement; 6]) -> FieldElement {
    sponge(DOMAIN_TAGS[3], &inputs)
}

/// Hashes an arbitrary-length slice of field elements. Used by the
/// commitment scheme and by any statistic whose sufficient-statistics
/// vector doesn't match one of the fixed widths above.
pub fn hash_variable(inputs: &[FieldElement]) -> FieldElement {
    // Mix the true length in so `hash_variable(&[a])` and
    // `hash_variable(&[a, 0])` can never collide.
    let tag = DOMAIN_TAGS[4] + Fr::from(inputs.len() as u64);
    sponge(tag, inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_on_same_input() {
        let a = FieldElement::new(7);
        let b = FieldElement::new(42);
        assert_eq!(hash2(a, b), hash2(a, b));
    }

    #[test]
    fn distinguishes_widths() {
        let a = FieldElement::new(1);
        let b = FieldElement::new(2);
        let c = FieldElement::new(3);
        assert_ne!(hash2(a, b), hash3(a, b, c));
    }

    #[test]
    fn variable_length_is_length_sensitive() {
        let one = FieldElement::new(9);
        let h1 = hash_variable(&[one]);
        let h2 = hash_variable(&[one, FieldElement::ZERO]);
        assert_ne!(h1, h2);
    }

    #[test]
    fn sensitive_to_order() {
        let a = FieldElement::new(11);
        let b = FieldElement::new(13);
        assert_ne!(hash2(a, b), hash2(b, a));
    }
}
