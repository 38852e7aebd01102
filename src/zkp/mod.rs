//! ZKP access & computation proofs (L3, spec §4.5): proof generation and
//! verification of access rights, computation integrity and data
//! ownership, wrapped around a pluggable [`prover::Prover`] /
//! [`prover::ProofVerifier`] pair. This module reproves nothing about
//! the circuits themselves, it owns correct wrapping, caching and
//! expiry (spec §4.5 "Contract with the prover/verifier collaborators").

pub mod proof;
pub mod prover;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::field::FieldElement;

pub use proof::{OnChainProof, ProofKind, ProofRecord, ACCESS_PROOF_TTL_MS};
pub use prover::{ProofVerifier, Prover};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Manages the full lifecycle of proof records on top of a pluggable
/// prover/verifier pair, plus a per-kind verification-key store used by
/// on-chain verifiers that need the circuit's verification key out of
/// band from any individual proof.
pub struct ZkpVerifier {
    prover: Arc<dyn Prover>,
    verifier: Arc<dyn ProofVerifier>,
    proofs: RwLock<HashMap<String, ProofRecord>>,
    verification_keys: RwLock<HashMap<ProofKind, Vec<u8>>>,
}

impl ZkpVerifier {
    pub fn new(prover: Arc<dyn Prover>, verifier: Arc<dyn ProofVerifier>) -> Self {
        ZkpVerifier {
            prover,
            verifier,
            proofs: RwLock::new(HashMap::new()),
            verification_keys: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set_verification_key(&self, kind: ProofKind, key: Vec<u8>) {
        self.verification_keys.write().await.insert(kind, key);
    }

    pub async fn verification_key(&self, kind: ProofKind) -> Option<Vec<u8>> {
        self.verification_keys.read().await.get(&kind).cloned()
    }

    /// Delegates to the prover, attaching a random nonce to the circuit
    /// inputs first so repeated proofs over identical inputs never
    /// collide. Stores the resulting record keyed by a fresh id; only
    /// `Access` proofs get an `expires_at` (spec §4.5 "Access proofs
    /// expire; computation/ownership proofs are permanent").
    pub async fn generate_proof(&self, kind: ProofKind, mut inputs: Value) -> Result<ProofRecord> {
        let nonce = FieldElement::random();
        if let Value::Object(map) = &mut inputs {
            map.insert("nonce".to_string(), Value::String(nonce.to_string()));
        }

        let (proof_bytes, public_signals) = self.prover.prove(kind, &inputs).await?;
        let created_at = now_millis();
        let expires_at = match kind {
            ProofKind::Access => Some(created_at + ACCESS_PROOF_TTL_MS),
            ProofKind::Computation | ProofKind::Ownership => None,
        };

        let record = ProofRecord {
            id: Uuid::new_v4().to_string(),
            kind,
            proof_bytes,
            public_signals,
            metadata: inputs,
            created_at,
            expires_at,
        };

        self.proofs
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    /// Checks (a) `proof.kind` is what the caller expects, (b) the proof
    /// hasn't expired, (c) the delegated verifier returns true.
    pub async fn verify_proof(&self, expected_kind: ProofKind, proof: &ProofRecord) -> Result<bool> {
        if proof.kind != expected_kind {
            return Ok(false);
        }
        if proof.is_expired(now_millis()) {
            return Ok(false);
        }
        self.verifier
            .verify(proof.kind, &proof.proof_bytes, &proof.public_signals)
            .await
    }

    pub async fn revoke(&self, proof_id: &str) -> Result<()> {
        self.proofs
            .write()
            .await
            .remove(proof_id)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidInput(format!("no such proof: {proof_id}")))
    }

    pub async fn get_proof(&self, proof_id: &str) -> Option<ProofRecord> {
        self.proofs.read().await.get(proof_id).cloned()
    }
}
