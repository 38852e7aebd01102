//! Modular arithmetic over the prime field GF(p).
//!
//! `p = 18446744069414584321 = 2^64 - 2^32 + 1` (the Goldilocks prime).
//! Every value that participates in secret sharing or protocol-engine
//! arithmetic is a [`FieldElement`]; raw integers never cross the type
//! boundary without going through [`FieldElement::new`], which reduces
//! mod p so canonical form (`< p`) is an invariant of the type itself.

use rand::RngCore;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::error::{Error, Result};

pub const FIELD_PRIME: u64 = 18_446_744_069_414_584_321;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldElement(u64);

impl FieldElement {
    pub const ZERO: FieldElement = FieldElement(0);
    pub const ONE: FieldElement = FieldElement(1);

    /// Reduces `value` mod p. Always produces a canonical representative.
    pub fn new(value: u64) -> Self {
        FieldElement(value % FIELD_PRIME)
    }

    /// Builds directly from an already-canonical value. Used on
    /// deserialization paths where re-reducing would mask a corrupt
    /// wire value; callers that can't guarantee canonicity should use
    /// [`FieldElement::new`] instead.
    pub fn from_canonical(value: u64) -> Result<Self> {
        if value >= FIELD_PRIME {
            return Err(Error::InvalidInput(format!(
                "field element {value} is not canonical (>= p)"
            )));
        }
        Ok(FieldElement(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// A uniformly random field element drawn from an OS-grade CSPRNG.
    /// Every privacy- or security-relevant draw in this crate goes
    /// through this function, never a seeded or thread-local PRNG.
    pub fn random() -> Self {
        let mut rng = OsRng;
        FieldElement(rng.next_u64() % FIELD_PRIME)
    }

    pub fn random_nonzero() -> Self {
        loop {
            let v = Self::random();
            if v.0 != 0 {
                return v;
            }
        }
    }

    /// Interprets `signed` as an element of GF(p), wrapping negative
    /// values to `p - |signed|` rather than silently truncating.
    pub fn from_i64(signed: i64) -> Self {
        if signed >= 0 {
            FieldElement::new(signed as u64)
        } else {
            let mag = signed.unsigned_abs() % FIELD_PRIME;
            FieldElement(FIELD_PRIME - mag)
        }
    }

    fn pow(&self, mut exponent: u64) -> FieldElement {
        let mut base = *self;
        let mut result = FieldElement::ONE;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result * base;
            }
            base = base * base;
            exponent >>= 1;
        }
        result
    }

    /// Multiplicative inverse via Fermat's little theorem: `a^(p-2)`.
    /// `None` only for zero, which has no inverse.
    pub fn inv(&self) -> Option<FieldElement> {
        if self.0 == 0 {
            return None;
        }
        Some(self.pow(FIELD_PRIME - 2))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for FieldElement {
    type Output = FieldElement;
    fn add(self, rhs: Self) -> Self {
        let sum = self.0 as u128 + rhs.0 as u128;
        FieldElement(if sum >= FIELD_PRIME as u128 {
            (sum - FIELD_PRIME as u128) as u64
        } else {
            sum as u64
        })
    }
}

impl Sub for FieldElement {
    type Output = FieldElement;
    fn sub(self, rhs: Self) -> Self {
        if self.0 >= rhs.0 {
            FieldElement(self.0 - rhs.0)
        } else {
            FieldElement(FIELD_PRIME - (rhs.0 - self.0))
        }
    }
}

impl Neg for FieldElement {
    type Output = FieldElement;
    fn neg(self) -> Self {
        FieldElement::ZERO - self
    }
}

impl Mul for FieldElement {
    type Output = FieldElement;
    fn mul(self, rhs: Self) -> Self {
        FieldElement(((self.0 as u128 * rhs.0 as u128) % FIELD_PRIME as u128) as u64)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FieldElement {
    fn from(v: u64) -> Self {
        FieldElement::new(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_wraps_at_p() {
        let a = FieldElement::new(FIELD_PRIME - 1);
        let b = FieldElement::new(2);
        assert_eq!((a + b).value(), 1);
    }

    #[test]
    fn sub_wraps_below_zero() {
        let a = FieldElement::new(5);
        let b = FieldElement::new(10);
        assert_eq!((a - b).value(), FIELD_PRIME - 5);
    }

    #[test]
    fn inv_round_trips() {
        let a = FieldElement::new(123_456_789);
        let inv = a.inv().unwrap();
        assert_eq!((a * inv).value(), 1);
    }

    #[test]
    fn zero_has_no_inverse() {
        assert!(FieldElement::ZERO.inv().is_none());
    }

    #[test]
    fn from_i64_wraps_negative() {
        let neg_one = FieldElement::from_i64(-1);
        assert_eq!(neg_one.value(), FIELD_PRIME - 1);
        assert_eq!((neg_one + FieldElement::ONE).value(), 0);
    }

    #[test]
    fn from_canonical_rejects_out_of_range() {
        assert!(FieldElement::from_canonical(FIELD_PRIME).is_err());
        assert!(FieldElement::from_canonical(FIELD_PRIME - 1).is_ok());
    }
}
