//! Crate-wide error taxonomy.
//!
//! One variant per error kind named in the error-handling design: bad
//! input is surfaced without mutating state, transport/threshold failures
//! drive state-machine aborts, and cryptographic check failures always
//! abort the affected computation. `Internal` never terminates the
//! process, only the computation that triggered it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient shares: need {needed}, have {have}")]
    InsufficientShares { needed: usize, have: usize },

    #[error("insufficient nodes: need {needed}, have {have}")]
    InsufficientNodes { needed: usize, have: usize },

    #[error("node {node_id} did not reply within {timeout_ms}ms")]
    ResponseTimeout { node_id: String, timeout_ms: u64 },

    #[error("node {node_id} disconnected")]
    NodeDisconnected { node_id: String },

    #[error("commitment mismatch for share at index {index}")]
    CommitmentMismatch { index: u32 },

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("privacy budget exhausted for session {session_key}: spent {spent}, requested {requested}, total {total}")]
    BudgetExhausted {
        session_key: String,
        spent: f64,
        requested: f64,
        total: f64,
    },

    #[error("computation {computation_id} exceeded its timeout")]
    Timeout { computation_id: String },

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("cryptographic error: {0}")]
    CryptographicError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("internal error (invariant violation): {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidInput(format!("configuration error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
