//! Node registry entry: the coordinator's view of one computation
//! participant, generalized from the teacher's `network::p2p::Peer`
//! connection bookkeeping (state, last-seen, capabilities) into the
//! `NodeEntry` shape of spec §3.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Connecting,
    Idle,
    Busy,
    Error,
    Disconnected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodeCapabilities {
    pub max_concurrent: u32,
    /// Relative compute power used by [`super::selection::select_nodes`]'s
    /// scoring function; unitless, compared only to other nodes'.
    pub compute_power: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: String,
    pub transport_address: String,
    pub state: NodeState,
    pub capabilities: NodeCapabilities,
    pub supported_protocols: HashSet<String>,
    pub active_computations: HashSet<String>,
    pub last_seen: u64,
    pub error_count: u32,
}

impl NodeEntry {
    pub fn new(
        id: impl Into<String>,
        transport_address: impl Into<String>,
        capabilities: NodeCapabilities,
        supported_protocols: HashSet<String>,
    ) -> Self {
        NodeEntry {
            id: id.into(),
            transport_address: transport_address.into(),
            state: NodeState::Connecting,
            capabilities,
            supported_protocols,
            active_computations: HashSet::new(),
            last_seen: now_millis(),
            error_count: 0,
        }
    }

    /// Invariant (spec §3): Busy implies `|active_computations| >=
    /// max_concurrent`; Idle implies strictly less. Called whenever
    /// `active_computations` changes.
    pub fn recompute_state(&mut self) {
        if self.state == NodeState::Disconnected || self.state == NodeState::Error {
            return;
        }
        self.state = if self.active_computations.len() as u32 >= self.capabilities.max_concurrent {
            NodeState::Busy
        } else {
            NodeState::Idle
        };
    }

    pub fn current_load(&self) -> f64 {
        if self.capabilities.max_concurrent == 0 {
            return 1.0;
        }
        (self.active_computations.len() as f64) / (self.capabilities.max_concurrent as f64)
    }

    pub fn touch(&mut self) {
        self.last_seen = now_millis();
    }

    pub fn supports(&self, protocol: &str) -> bool {
        self.supported_protocols.contains(protocol)
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self.state, NodeState::Idle | NodeState::Connecting)
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> NodeEntry {
        NodeEntry::new(
            "n1",
            "ws://127.0.0.1:9000",
            NodeCapabilities {
                max_concurrent: 2,
                compute_power: 1.0,
            },
            HashSet::from(["mean".to_string()]),
        )
    }

    #[test]
    fn becomes_busy_at_capacity() {
        let mut n = entry();
        n.state = NodeState::Idle;
        n.active_computations.insert("c1".into());
        n.recompute_state();
        assert_eq!(n.state, NodeState::Idle);
        n.active_computations.insert("c2".into());
        n.recompute_state();
        assert_eq!(n.state, NodeState::Busy);
    }

    #[test]
    fn disconnected_state_is_sticky() {
        let mut n = entry();
        n.state = NodeState::Disconnected;
        n.recompute_state();
        assert_eq!(n.state, NodeState::Disconnected);
    }

    #[test]
    fn load_is_fraction_of_capacity() {
        let mut n = entry();
        n.active_computations.insert("c1".into());
        assert!((n.current_load() - 0.5).abs() < 1e-12);
    }
}
