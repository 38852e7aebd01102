//! Explicit event bus (spec §9 "from callback/event emitters to an
//! explicit event bus"): every externally-observable state change the
//! coordinator makes is published here instead of being threaded through
//! ad hoc callbacks, so a status endpoint, a test harness, or an audit
//! log can all subscribe independently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::state::{AbortReason, ComputationState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinatorEvent {
    NodeRegistered { node_id: String },
    NodeDisconnected { node_id: String },
    ComputationCreated { computation_id: String },
    ComputationStateChanged { computation_id: String, state: ComputationState },
    ComputationAborted { computation_id: String, reason: AbortReason },
    ComputationCompleted { computation_id: String },
}

/// Wraps a [`broadcast`] channel; a subscriber that falls behind has its
/// missed messages counted in `lagged` rather than the whole bus
/// blocking on it.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoordinatorEvent>,
    lagged: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus {
            sender,
            lagged: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn publish(&self, event: CoordinatorEvent) {
        // No receivers is not an error: nothing is subscribed yet.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.sender.subscribe()
    }

    /// Drains one event for a subscriber, counting (rather than
    /// propagating) a lag error so a slow status watcher never takes
    /// down the publishing side.
    pub async fn recv(receiver: &mut broadcast::Receiver<CoordinatorEvent>, lagged: &AtomicU64) -> Option<CoordinatorEvent> {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    lagged.fetch_add(n, Ordering::Relaxed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn lagged_count(&self) -> u64 {
        self.lagged.load(Ordering::Relaxed)
    }

    pub fn lagged_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.lagged)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(256)
    }
}
