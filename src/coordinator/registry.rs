//! Node registry: the coordinator's single owning map of all known
//! nodes, generalized from `network::p2p::P2PNode`'s
//! `Arc<RwLock<HashMap<...>>>` peer-management convention (§9).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::node::{NodeCapabilities, NodeEntry, NodeState};
use crate::error::{Error, Result};

#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<String, NodeEntry>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        NodeRegistry::default()
    }

    pub async fn register(
        &self,
        id: impl Into<String>,
        transport_address: impl Into<String>,
        capabilities: NodeCapabilities,
        supported_protocols: std::collections::HashSet<String>,
    ) {
        let entry = NodeEntry::new(id, transport_address, capabilities, supported_protocols);
        let mut nodes = self.nodes.write().await;
        nodes.insert(entry.id.clone(), entry);
    }

    pub async fn get(&self, id: &str) -> Option<NodeEntry> {
        self.nodes.read().await.get(id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<NodeEntry> {
        self.nodes.read().await.values().cloned().collect()
    }

    pub async fn set_state(&self, id: &str, state: NodeState) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown node {id}")))?;
        node.state = state;
        Ok(())
    }

    pub async fn touch(&self, id: &str) {
        if let Some(node) = self.nodes.write().await.get_mut(id) {
            node.touch();
        }
    }

    pub async fn record_error(&self, id: &str) -> u32 {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(id) {
            Some(node) => {
                node.error_count += 1;
                node.error_count
            }
            None => 0,
        }
    }

    /// Marks `id` assigned to `computation_id` and recomputes
    /// Idle/Busy per the node-load invariant.
    pub async fn assign(&self, id: &str, computation_id: &str) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown node {id}")))?;
        node.active_computations.insert(computation_id.to_string());
        node.recompute_state();
        Ok(())
    }

    pub async fn release(&self, id: &str, computation_id: &str) {
        if let Some(node) = self.nodes.write().await.get_mut(id) {
            node.active_computations.remove(computation_id);
            node.recompute_state();
        }
    }

    /// Marks `id` Disconnected and returns the computation ids it was
    /// still assigned to, so the caller can react per spec §4.4 "Fault
    /// tolerance".
    pub async fn disconnect(&self, id: &str) -> Vec<String> {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(id) {
            Some(node) => {
                node.state = NodeState::Disconnected;
                node.active_computations.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub async fn stale_since(&self, now_millis: u64, node_timeout_ms: u64) -> Vec<String> {
        self.nodes
            .read()
            .await
            .values()
            .filter(|n| {
                n.state != NodeState::Disconnected
                    && now_millis.saturating_sub(n.last_seen) > node_timeout_ms
            })
            .map(|n| n.id.clone())
            .collect()
    }
}
