//! `smpc-core`: coordination engine and cryptographic primitives for
//! privacy-preserving multi-party aggregate statistics.
//!
//! A researcher requests an aggregate statistic (mean, variance,
//! correlation, percentile, histogram, linear regression, t-test,
//! chi-square) over data held privately across several data-owner
//! nodes. No node sees another node's raw values, the coordinator sees
//! no plaintext, and the published result carries an (ε, δ)-differential-
//! privacy guarantee plus a zero-knowledge proof of correct execution.
//!
//! The crate is layered leaves-first:
//!
//! - [`field`] / [`hash`] / [`commitment`], L0: modular arithmetic over
//!   a prime field, Poseidon/Keccak256 hashing, hiding-and-binding
//!   commitments.
//! - [`secret_sharing`], L1: Shamir, additive, replicated and hybrid
//!   secret sharing with verifiable commitments.
//! - [`protocol`], L2: the statistical operation catalog, differential-
//!   privacy noise injection, the share lifecycle, and per-session
//!   privacy-budget accounting.
//! - [`coordinator`], L3: the node registry, selection, computation
//!   state machine, transport, fault tolerance and queueing.
//! - [`zkp`], L3: access/ownership/computation proof lifecycle over a
//!   pluggable prover/verifier pair.
//! - [`orchestrator`], L4: binds the above into one request-to-result
//!   flow.

pub mod commitment;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod field;
pub mod hash;
pub mod http;
pub mod orchestrator;
pub mod protocol;
pub mod secret_sharing;
pub mod telemetry;
pub mod zkp;

pub use error::{Error, Result};
