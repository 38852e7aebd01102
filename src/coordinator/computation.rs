//! The computation record: one owning struct per in-flight computation
//! (spec §9 "from object-sprawled computations to a single owning
//! record"). Node cross-references are plain `String` ids, a
//! relation-not-ownership back-reference, so a node disconnecting mid
//! transition never dangles a pointer into this record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::protocol::lifecycle::{FinalResult, PrivacyParameters};
use crate::protocol::operation::Operation;
use crate::secret_sharing::Share;

use super::node::now_millis;
use super::state::{AbortReason, ComputationState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInitResult {
    pub node_id: String,
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeVerificationResult {
    pub node_id: String,
    pub verified: bool,
}

#[derive(Clone)]
pub struct Computation {
    pub id: String,
    pub operation: Operation,
    pub session_key: String,
    pub threshold: u32,
    pub assigned_nodes: Vec<String>,
    /// For each node id, the set of peer node ids it may accept direct
    /// shares from (spec §3 invariant: "a node's received share from
    /// peer P is accepted only if P is in peers_per_node for that
    /// recipient").
    pub peers_per_node: HashMap<String, Vec<String>>,
    pub state: ComputationState,
    pub received_shares: HashMap<String, Vec<Share>>,
    pub node_results: HashMap<String, FinalResult>,
    pub verification_results: HashMap<String, bool>,
    pub init_acks: HashMap<String, NodeInitResult>,
    pub privacy_parameters: PrivacyParameters,
    pub error_count: u32,
    pub started_at: u64,
    pub updated_at: u64,
    pub timeout_at: u64,
    pub abort_reason: Option<AbortReason>,
    pub result: Option<FinalResult>,
}

impl Computation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        operation: Operation,
        session_key: impl Into<String>,
        threshold: u32,
        assigned_nodes: Vec<String>,
        privacy_parameters: PrivacyParameters,
        computation_timeout_ms: u64,
    ) -> Self {
        let now = now_millis();
        let peers_per_node = assigned_nodes
            .iter()
            .map(|id| {
                let peers = assigned_nodes
                    .iter()
                    .filter(|other| *other != id)
                    .cloned()
                    .collect();
                (id.clone(), peers)
            })
            .collect();
        Computation {
            id: id.into(),
            operation,
            session_key: session_key.into(),
            threshold,
            assigned_nodes,
            peers_per_node,
            state: ComputationState::Created,
            received_shares: HashMap::new(),
            node_results: HashMap::new(),
            verification_results: HashMap::new(),
            init_acks: HashMap::new(),
            privacy_parameters,
            error_count: 0,
            started_at: now,
            updated_at: now,
            timeout_at: now + computation_timeout_ms,
            abort_reason: None,
            result: None,
        }
    }

    /// Applies a transition if legal per the state DAG (spec §4.4,
    /// enforced by [`ComputationState::can_transition_to`]); returns
    /// `false` (no-op) on an illegal transition rather than panicking,
    /// so a stray late message can never corrupt state monotonicity.
    pub fn transition(&mut self, next: ComputationState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        self.updated_at = now_millis();
        true
    }

    pub fn abort(&mut self, reason: AbortReason) {
        if self.state.is_terminal() {
            return;
        }
        self.state = ComputationState::Aborted;
        self.abort_reason = Some(reason);
        self.updated_at = now_millis();
    }

    pub fn healthy_node_count(&self, disconnected: &std::collections::HashSet<String>) -> usize {
        self.assigned_nodes
            .iter()
            .filter(|n| !disconnected.contains(*n))
            .count()
    }

    pub fn accepts_peer_share(&self, recipient: &str, sender: &str) -> bool {
        self.peers_per_node
            .get(recipient)
            .map(|peers| peers.iter().any(|p| p == sender))
            .unwrap_or(false)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.timeout_at
    }
}
