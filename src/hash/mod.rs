//! Hash primitives: a ZK-friendly hash ([`poseidon`]) for anything that
//! ends up inside a circuit (commitments, proof public signals), and a
//! conventional hash ([`keccak`]) for everything off-chain.

pub mod keccak;
pub mod poseidon;

pub use keccak::keccak256;
pub use poseidon::{hash2, hash3, hash4, hash6, hash_variable};
