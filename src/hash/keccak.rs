//! Keccak256 for off-chain use (log digests, wire-level integrity
//! checks) where circuit-friendliness doesn't matter and a
//! battle-tested hash is preferable to Poseidon.

use sha3::{Digest, Keccak256};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}
