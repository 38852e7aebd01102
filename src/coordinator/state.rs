//! The computation state machine's closed set of states and abort
//! reasons (spec §4.4), matched exhaustively wherever transitions are
//! driven, the "typed variants" redesign flag (spec §9) applied to the
//! coordinator layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputationState {
    Created,
    /// Admitted past the budget and node-selection checks but held back
    /// because the coordinator is already at `max_concurrent_computations`
    /// (spec §4.4 "Queueing"); left exactly when the queue's head is
    /// popped and `Coordinator::start_computation` runs.
    Queued,
    Initializing,
    AwaitingNodes,
    Distributing,
    Processing,
    Collecting,
    Aggregating,
    Verifying,
    Completed,
    Failed,
    Aborted,
}

impl ComputationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ComputationState::Completed | ComputationState::Failed | ComputationState::Aborted)
    }

    /// The state DAG of spec §4.4, used to enforce state monotonicity
    /// (spec §8): `next` is a legal successor of `self` only if it
    /// appears here, or `next` is `Failed`/`Aborted` (either terminal
    /// state is reachable from anywhere non-terminal).
    fn successors(self) -> &'static [ComputationState] {
        use ComputationState::*;
        match self {
            Created => &[Initializing, Queued],
            Queued => &[Initializing],
            Initializing => &[Distributing],
            AwaitingNodes => &[Distributing],
            Distributing => &[Processing],
            Processing => &[Collecting],
            Collecting => &[Aggregating],
            Aggregating => &[Verifying],
            Verifying => &[Completed],
            Completed | Failed | Aborted => &[],
        }
    }

    pub fn can_transition_to(self, next: ComputationState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == ComputationState::Failed
            || next == ComputationState::Aborted
            || self.successors().contains(&next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    Timeout,
    NodeDisconnected,
    VerificationFailed,
    InsufficientNodes,
    TooManyErrors,
    RequestedByCaller,
    /// A non-idempotent command's reply never arrived within
    /// `node_timeout_ms`, after the transport contract's retry budget
    /// for idempotent commands was exhausted or didn't apply.
    ResponseTimeout,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AbortReason::Timeout => "timeout",
            AbortReason::NodeDisconnected => "node disconnected",
            AbortReason::VerificationFailed => "verification failed",
            AbortReason::InsufficientNodes => "insufficient nodes",
            AbortReason::TooManyErrors => "too many node errors",
            AbortReason::RequestedByCaller => "requested by caller",
            AbortReason::ResponseTimeout => "response timeout",
        };
        write!(f, "{s}")
    }
}
