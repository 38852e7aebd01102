//! FIFO queue of computation ids awaiting a free slot, bounded by
//! `max_concurrent_computations` in the coordinator's admission check.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct ComputationQueue {
    pending: Arc<Mutex<VecDeque<String>>>,
}

impl ComputationQueue {
    pub fn new() -> Self {
        ComputationQueue::default()
    }

    pub async fn push(&self, computation_id: impl Into<String>) {
        self.pending.lock().await.push_back(computation_id.into());
    }

    pub async fn pop(&self) -> Option<String> {
        self.pending.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let q = ComputationQueue::new();
        q.push("a").await;
        q.push("b").await;
        assert_eq!(q.pop().await, Some("a".to_string()));
        assert_eq!(q.pop().await, Some("b".to_string()));
        assert_eq!(q.pop().await, None);
    }

    #[tokio::test]
    async fn len_tracks_pending_entries() {
        let q = ComputationQueue::new();
        assert!(q.is_empty().await);
        q.push("a").await;
        assert_eq!(q.len().await, 1);
    }
}
