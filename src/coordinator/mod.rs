//! Coordinator (L3, spec §4.4): the stateful distributed orchestrator.
//! Owns the node registry, drives every computation's state machine,
//! delivers messages over a per-node transport, reacts to node failures,
//! and enforces timeouts, a single logical event loop (spec §5),
//! generalized from the teacher's `network::p2p::P2PNode` /
//! `network::http::HttpServer` `tokio::select!` + `Arc<RwLock<...>>`
//! conventions.

pub mod computation;
pub mod events;
pub mod fault;
pub mod node;
pub mod queue;
pub mod registry;
pub mod selection;
pub mod state;
pub mod timers;
pub mod transport;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::budget::PrivacyBudget;
use crate::protocol::lifecycle::{
    aggregate_results, prepare_data, verify_result, FinalResult, NodeOutcome, PrivacyParameters,
};
use crate::protocol::operation::Operation;
use crate::protocol::statistics::SufficientStatistics;
use crate::secret_sharing::Share;

pub use computation::{Computation, NodeInitResult, NodeVerificationResult};
pub use events::{CoordinatorEvent, EventBus};
pub use node::{NodeCapabilities, NodeEntry, NodeState};
pub use queue::ComputationQueue;
pub use registry::NodeRegistry;
pub use selection::{select_nodes, SelectionRequest};
pub use state::{AbortReason, ComputationState};
pub use transport::{Envelope, EventChannel, InMemoryTransport, Message, Transport, WebSocketTransport};

/// Configuration keys of spec §6, given Rust-typed names.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub min_nodes: usize,
    pub max_nodes_per_computation: usize,
    pub node_timeout_ms: u64,
    pub computation_timeout_ms: u64,
    pub max_concurrent_computations: usize,
    pub fault_tolerance_enabled: bool,
    /// Per-session-key cumulative epsilon ceiling charged in
    /// [`Coordinator::create_computation`] (spec §4.4 `BudgetExhausted`).
    /// `f64::INFINITY` disables enforcement.
    pub session_epsilon_budget: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            min_nodes: 2,
            max_nodes_per_computation: 10,
            node_timeout_ms: 30_000,
            computation_timeout_ms: 300_000,
            max_concurrent_computations: 16,
            fault_tolerance_enabled: true,
            session_epsilon_budget: f64::INFINITY,
        }
    }
}

/// The parameters a caller (typically [`crate::orchestrator::Orchestrator`])
/// supplies to start one computation.
pub struct ComputationRequest {
    pub operation: Operation,
    pub session_key: String,
    pub protocol: String,
    pub required_nodes: Vec<String>,
    pub preferred_nodes: Vec<String>,
    /// L2's own default threshold (`ceil(n/2)`); the coordinator's
    /// stricter `ceil(n/2)+1` wins when the two disagree (spec §9 "the
    /// relationship between protocol-engine threshold and coordinator
    /// threshold is inconsistent in the source; the spec adopts the
    /// stricter value").
    pub protocol_threshold: Option<u32>,
    pub privacy_parameters: PrivacyParameters,
    /// The shape sufficient-statistics reconstruction rebuilds into
    /// (histogram bucket count, variant); see
    /// [`crate::protocol::statistics::SufficientStatistics::from_field_vec`].
    pub stats_template: SufficientStatistics,
    pub target_percentile: f64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Initialize,
}

impl PendingKind {
    /// Idempotent commands (spec §4.4 "Transport contract") are safe to
    /// resend on timeout rather than aborting the computation outright.
    fn is_idempotent(self) -> bool {
        matches!(self, PendingKind::Initialize)
    }
}

/// Max resends of an idempotent command before its computation is
/// aborted with [`AbortReason::ResponseTimeout`].
const MAX_RESPONSE_RETRIES: u32 = 2;

struct PendingReply {
    computation_id: String,
    node_id: String,
    kind: PendingKind,
    sent_at: u64,
    attempts: u32,
}

/// The single owning orchestrator for every in-flight computation and
/// every registered node. All mutation happens from handlers invoked by
/// [`Coordinator::run`]'s event loop (spec §5 "coarse-grained
/// single-writer discipline").
pub struct Coordinator {
    pub registry: NodeRegistry,
    pub events: EventBus,
    queue: ComputationQueue,
    transport: Arc<dyn Transport>,
    config: CoordinatorConfig,
    computations: RwLock<HashMap<String, Computation>>,
    /// Nodes that have posted `share_notification` for a computation,
    /// cleared once the Distributing→Processing transition fires.
    share_acks: RwLock<HashMap<String, HashSet<String>>>,
    /// Per-node outcomes (summed shares or finalized results) feeding
    /// `aggregate_results`/`verify_result`.
    outcomes: RwLock<HashMap<String, HashMap<String, NodeOutcome>>>,
    templates: RwLock<HashMap<String, (SufficientStatistics, f64)>>,
    pending_replies: RwLock<HashMap<String, PendingReply>>,
    /// Per-`session_key` cumulative epsilon ledger (spec §4.4
    /// `BudgetExhausted`), charged before a computation is admitted.
    budgets: RwLock<HashMap<String, PrivacyBudget>>,
}

impl Coordinator {
    pub fn new(transport: Arc<dyn Transport>, config: CoordinatorConfig) -> Self {
        Coordinator {
            registry: NodeRegistry::new(),
            events: EventBus::default(),
            queue: ComputationQueue::new(),
            transport,
            config,
            computations: RwLock::new(HashMap::new()),
            share_acks: RwLock::new(HashMap::new()),
            outcomes: RwLock::new(HashMap::new()),
            templates: RwLock::new(HashMap::new()),
            pending_replies: RwLock::new(HashMap::new()),
            budgets: RwLock::new(HashMap::new()),
        }
    }

    /// Charges `epsilon` against `session_key`'s cumulative budget,
    /// creating a fresh ledger seeded at `session_epsilon_budget` the
    /// first time the session is seen.
    async fn charge_budget(&self, session_key: &str, epsilon: f64) -> Result<()> {
        let mut budgets = self.budgets.write().await;
        let budget = budgets
            .entry(session_key.to_string())
            .or_insert_with(|| PrivacyBudget::new(session_key, self.config.session_epsilon_budget));
        budget.charge(epsilon)
    }

    pub async fn register_node(
        &self,
        id: impl Into<String>,
        transport_address: impl Into<String>,
        capabilities: NodeCapabilities,
        supported_protocols: HashSet<String>,
    ) {
        let id = id.into();
        self.registry
            .register(id.clone(), transport_address, capabilities, supported_protocols)
            .await;
        self.registry.set_state(&id, NodeState::Idle).await.ok();
        self.events.publish(CoordinatorEvent::NodeRegistered { node_id: id });
    }

    pub async fn active_computation_count(&self) -> usize {
        self.computations
            .read()
            .await
            .values()
            .filter(|c| !c.state.is_terminal())
            .count()
    }

    async fn healthy_nodes(&self, comp: &Computation) -> Vec<String> {
        let mut healthy = Vec::with_capacity(comp.assigned_nodes.len());
        for id in &comp.assigned_nodes {
            match self.registry.get(id).await {
                Some(n) if n.state != NodeState::Disconnected => healthy.push(id.clone()),
                _ => {}
            }
        }
        healthy
    }

    /// Selects nodes, picks the stricter of the two candidate thresholds,
    /// creates the computation record, and either starts it immediately
    /// or enqueues it FIFO if the coordinator is already at capacity
    /// (spec §4.4 "Queueing").
    pub async fn create_computation(&self, request: ComputationRequest) -> Result<String> {
        self.charge_budget(&request.session_key, request.privacy_parameters.epsilon).await?;

        let snapshot = self.registry.snapshot().await;
        let selection = SelectionRequest {
            protocol: &request.protocol,
            required: &request.required_nodes,
            preferred: &request.preferred_nodes,
            min_nodes: self.config.min_nodes,
            max_nodes: self.config.max_nodes_per_computation,
        };
        let selected = select_nodes(&snapshot, &selection)?;

        // Coordinator threshold is the stricter `ceil(n/2)+1`; it wins
        // over L2's own `ceil(n/2)` default whenever the two disagree.
        let coordinator_threshold = (selected.len() as f64 / 2.0).ceil() as u32 + 1;
        let threshold = request.protocol_threshold.unwrap_or(0).max(coordinator_threshold);

        let id = Uuid::new_v4().to_string();
        let computation = Computation::new(
            id.clone(),
            request.operation,
            request.session_key,
            threshold,
            selected.clone(),
            request.privacy_parameters,
            self.config.computation_timeout_ms,
        );

        for node_id in &selected {
            self.registry.assign(node_id, &id).await?;
        }

        self.templates
            .write()
            .await
            .insert(id.clone(), (request.stats_template, request.target_percentile));
        self.computations.write().await.insert(id.clone(), computation);
        self.events.publish(CoordinatorEvent::ComputationCreated { computation_id: id.clone() });

        if self.active_computation_count().await <= self.config.max_concurrent_computations {
            self.start_computation(&id).await?;
        } else {
            let queued = self
                .computations
                .write()
                .await
                .get_mut(&id)
                .map(|comp| comp.transition(ComputationState::Queued))
                .unwrap_or(false);
            if queued {
                self.events.publish(CoordinatorEvent::ComputationStateChanged {
                    computation_id: id.clone(),
                    state: ComputationState::Queued,
                });
            }
            self.queue.push(id.clone()).await;
        }
        Ok(id)
    }

    /// Created→Initializing: sends `initialize` to every assigned node
    /// with the full peer-address list, per spec §4.4 "Peer-to-peer".
    async fn start_computation(&self, id: &str) -> Result<()> {
        let mut computations = self.computations.write().await;
        let comp = computations
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("unknown computation {id}")))?;
        if !comp.transition(ComputationState::Initializing) {
            return Ok(());
        }
        let assigned = comp.assigned_nodes.clone();
        drop(computations);

        let mut peer_addresses = Vec::with_capacity(assigned.len());
        for node_id in &assigned {
            if let Some(entry) = self.registry.get(node_id).await {
                peer_addresses.push((entry.id, entry.transport_address));
            }
        }

        for node_id in &assigned {
            self.send_initialize(id, node_id, &peer_addresses, 0).await?;
        }
        self.events.publish(CoordinatorEvent::ComputationStateChanged {
            computation_id: id.to_string(),
            state: ComputationState::Initializing,
        });
        Ok(())
    }

    /// Sends (or resends) `initialize` to one node, tracking a fresh
    /// [`PendingReply`] keyed by the new envelope's `message_id` so
    /// [`Coordinator::scan_response_timeouts`] can notice it going stale.
    async fn send_initialize(
        &self,
        computation_id: &str,
        node_id: &str,
        peer_addresses: &[(String, String)],
        attempts: u32,
    ) -> Result<()> {
        let envelope = Envelope::command(
            "coordinator",
            Message::Initialize {
                computation_id: computation_id.to_string(),
                peer_addresses: peer_addresses.to_vec(),
            },
        );
        self.pending_replies.write().await.insert(
            envelope.message_id.clone(),
            PendingReply {
                computation_id: computation_id.to_string(),
                node_id: node_id.to_string(),
                kind: PendingKind::Initialize,
                sent_at: node::now_millis(),
                attempts,
            },
        );
        self.transport.send(node_id, envelope).await
    }

    /// Every inbound frame from any node passes through here, whether it
    /// is a reply to a pending command (`in_reply_to` set) or a
    /// spontaneous event.
    pub async fn handle_event(&self, node_id: &str, envelope: Envelope) -> Result<()> {
        self.registry.touch(node_id).await;

        if let Some(reply_to) = envelope.in_reply_to.clone() {
            self.handle_reply(node_id, &reply_to, &envelope.payload).await?;
        }

        match &envelope.payload {
            Message::Registration { .. } => {
                self.events
                    .publish(CoordinatorEvent::NodeRegistered { node_id: node_id.to_string() });
            }
            Message::ShareNotification { computation_id, .. } => {
                self.on_share_notification(computation_id, node_id).await?;
            }
            Message::Result {
                computation_id,
                shares,
                result,
                weight,
            } => {
                self.on_result(computation_id, node_id, shares.clone(), result.clone(), *weight)
                    .await?;
            }
            Message::VerificationResult {
                computation_id,
                verified,
            } => {
                self.on_verification_result(computation_id, node_id, *verified).await?;
            }
            Message::NodeError { computation_id, message } => {
                if let Some(cid) = computation_id {
                    self.on_node_error(cid, node_id, message).await?;
                }
            }
            Message::Pong => {}
            Message::Unknown => {
                return Err(Error::TransportError(format!(
                    "unrecognized message from {node_id}"
                )));
            }
            // Commands are coordinator→node; receiving one back is a
            // protocol violation we simply ignore rather than fail the
            // whole handler over.
            _ => {}
        }
        Ok(())
    }

    async fn handle_reply(&self, node_id: &str, reply_to: &str, payload: &Message) -> Result<()> {
        let pending = self.pending_replies.write().await.remove(reply_to);
        let Some(pending) = pending else { return Ok(()) };
        match pending.kind {
            PendingKind::Initialize => {
                let accepted = !matches!(payload, Message::NodeError { .. } | Message::Unknown);
                self.record_init_ack(&pending.computation_id, node_id, accepted).await?;
            }
        }
        Ok(())
    }

    async fn record_init_ack(&self, computation_id: &str, node_id: &str, accepted: bool) -> Result<()> {
        let mut computations = self.computations.write().await;
        let Some(comp) = computations.get_mut(computation_id) else { return Ok(()) };
        if comp.state != ComputationState::Initializing {
            return Ok(());
        }
        comp.init_acks.insert(
            node_id.to_string(),
            NodeInitResult {
                node_id: node_id.to_string(),
                accepted,
            },
        );
        let healthy = comp
            .assigned_nodes
            .iter()
            .filter(|n| comp.init_acks.get(*n).map(|a| a.accepted).unwrap_or(false))
            .count();
        let all_in = comp.assigned_nodes.iter().all(|n| comp.init_acks.contains_key(n));
        let threshold_met = healthy as u32 >= comp.threshold;
        if all_in || threshold_met {
            comp.transition(ComputationState::Distributing);
        }
        Ok(())
    }

    async fn on_share_notification(&self, computation_id: &str, node_id: &str) -> Result<()> {
        let transitioned;
        {
            let mut acks = self.share_acks.write().await;
            acks.entry(computation_id.to_string())
                .or_default()
                .insert(node_id.to_string());
        }
        {
            let mut computations = self.computations.write().await;
            let Some(comp) = computations.get_mut(computation_id) else { return Ok(()) };
            let acks = self.share_acks.read().await;
            let posted = acks.get(computation_id).cloned().unwrap_or_default();
            drop(acks);
            let healthy = self.healthy_nodes(comp).await;
            transitioned = healthy.iter().all(|n| posted.contains(n)) && !healthy.is_empty() && comp
                .transition(ComputationState::Processing);
        }
        if transitioned {
            self.events.publish(CoordinatorEvent::ComputationStateChanged {
                computation_id: computation_id.to_string(),
                state: ComputationState::Processing,
            });
            self.share_acks.write().await.remove(computation_id);
        }
        Ok(())
    }

    async fn on_result(
        &self,
        computation_id: &str,
        node_id: &str,
        shares: Option<Vec<Share>>,
        result: Option<FinalResult>,
        weight: f64,
    ) -> Result<()> {
        let outcome = match (shares, result) {
            (Some(s), _) => NodeOutcome::Shares(s, weight),
            (None, Some(r)) => NodeOutcome::Final(r, weight),
            (None, None) => {
                return Err(Error::InvalidInput(format!(
                    "result from {node_id} carried neither shares nor a finalized result"
                )))
            }
        };
        self.outcomes
            .write()
            .await
            .entry(computation_id.to_string())
            .or_default()
            .insert(node_id.to_string(), outcome);

        let (operation, threshold, healthy, was_processing);
        {
            let mut computations = self.computations.write().await;
            let Some(comp) = computations.get_mut(computation_id) else { return Ok(()) };
            was_processing = comp.state == ComputationState::Processing;
            if was_processing {
                comp.transition(ComputationState::Collecting);
            }
            operation = comp.operation;
            threshold = comp.threshold;
            healthy = self.healthy_nodes(comp).await;
        }
        if was_processing {
            self.events.publish(CoordinatorEvent::ComputationStateChanged {
                computation_id: computation_id.to_string(),
                state: ComputationState::Collecting,
            });
        }

        let have = self
            .outcomes
            .read()
            .await
            .get(computation_id)
            .map(|m| m.keys().filter(|k| healthy.contains(*k)).count())
            .unwrap_or(0);

        if have >= healthy.len() && have >= threshold as usize {
            self.aggregate_and_verify(computation_id, operation).await?;
        }
        Ok(())
    }

    /// Collecting→Aggregating→Verifying: reduces every healthy node's
    /// outcome to one candidate result and fans out `verify` so each
    /// node can independently recompute it (spec §4.4 "Aggregating→Verifying").
    async fn aggregate_and_verify(&self, computation_id: &str, operation: Operation) -> Result<()> {
        let assigned;
        {
            let mut computations = self.computations.write().await;
            let Some(comp) = computations.get_mut(computation_id) else { return Ok(()) };
            if !comp.transition(ComputationState::Aggregating) {
                return Ok(());
            }
            assigned = comp.assigned_nodes.clone();
        }

        let per_node: Vec<NodeOutcome> = self
            .outcomes
            .read()
            .await
            .get(computation_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        let (template, target_percentile) = self
            .templates
            .read()
            .await
            .get(computation_id)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("missing stats template for {computation_id}")))?;

        let result = {
            let per_node = per_node.clone();
            tokio::task::spawn_blocking(move || {
                aggregate_results(&per_node, operation, &template, target_percentile)
            })
            .await
            .map_err(|e| Error::Internal(format!("aggregation task panicked: {e}")))??
        };

        {
            let mut computations = self.computations.write().await;
            if let Some(comp) = computations.get_mut(computation_id) {
                comp.result = Some(result.clone());
                comp.transition(ComputationState::Verifying);
            }
        }
        self.events.publish(CoordinatorEvent::ComputationStateChanged {
            computation_id: computation_id.to_string(),
            state: ComputationState::Verifying,
        });

        for node_id in &assigned {
            let envelope = Envelope::command(
                "coordinator",
                Message::Verify {
                    computation_id: computation_id.to_string(),
                    result: result.clone(),
                },
            );
            // Best-effort: a node that fails to receive `verify` simply
            // never reports verified=true, and the computation times out
            // rather than the fan-out itself failing the transition.
            let _ = self.transport.send(node_id, envelope).await;
        }
        Ok(())
    }

    async fn on_verification_result(&self, computation_id: &str, node_id: &str, verified: bool) -> Result<()> {
        if !verified {
            self.abort_computation(computation_id, AbortReason::VerificationFailed).await?;
            return Ok(());
        }

        let should_complete;
        {
            let mut computations = self.computations.write().await;
            let Some(comp) = computations.get_mut(computation_id) else { return Ok(()) };
            comp.verification_results.insert(node_id.to_string(), verified);
            let healthy = self.healthy_nodes(comp).await;
            should_complete = !healthy.is_empty()
                && healthy
                    .iter()
                    .all(|n| comp.verification_results.get(n).copied().unwrap_or(false));
            if should_complete {
                comp.transition(ComputationState::Completed);
            }
        }
        if should_complete {
            self.events
                .publish(CoordinatorEvent::ComputationCompleted { computation_id: computation_id.to_string() });
            self.release_computation(computation_id).await;
            self.start_next_queued().await?;
        }
        Ok(())
    }

    async fn on_node_error(&self, computation_id: &str, node_id: &str, _message: &str) -> Result<()> {
        let decision;
        {
            let mut computations = self.computations.write().await;
            let Some(comp) = computations.get_mut(computation_id) else { return Ok(()) };
            comp.error_count += 1;
            decision = fault::on_node_error(comp.error_count, fault::MAX_NODE_ERRORS);
        }
        self.registry.record_error(node_id).await;
        if let Some(reason) = decision {
            self.abort_computation(computation_id, reason).await?;
        }
        Ok(())
    }

    /// Reacts to a transport-level disconnect: drops the node from every
    /// computation it was assigned to, continuing (treating its pending
    /// share as zero) when fault tolerance allows it, else aborting
    /// (spec §4.4 "Fault tolerance").
    pub async fn disconnect_node(&self, node_id: &str) -> Result<()> {
        let active = self.registry.disconnect(node_id).await;
        self.events
            .publish(CoordinatorEvent::NodeDisconnected { node_id: node_id.to_string() });
        self.transport.disconnect(node_id).await;

        for computation_id in active {
            let (healthy_after, threshold, is_terminal) = {
                let computations = self.computations.read().await;
                let Some(comp) = computations.get(&computation_id) else { continue };
                (self.healthy_nodes(comp).await.len(), comp.threshold, comp.state.is_terminal())
            };
            if is_terminal {
                continue;
            }
            match fault::on_node_disconnect(healthy_after, threshold, self.config.fault_tolerance_enabled) {
                Some(reason) => {
                    self.abort_computation(&computation_id, reason).await?;
                }
                None => {
                    // Survivors still satisfy threshold; the dropped
                    // node's pending share/result is simply never
                    // counted (healthy_nodes already excludes it), so
                    // the existing completion checks converge without
                    // further action here.
                }
            }
        }
        Ok(())
    }

    /// Cancellable at any time (spec §5 "Cancellation"): idempotent on
    /// already-terminal computations, fans out `abort` best-effort, and
    /// releases every resource tied to the computation before returning.
    pub async fn abort_computation(&self, computation_id: &str, reason: AbortReason) -> Result<()> {
        let assigned = {
            let mut computations = self.computations.write().await;
            let Some(comp) = computations.get_mut(computation_id) else {
                return Err(Error::InvalidInput(format!("unknown computation {computation_id}")));
            };
            if comp.state.is_terminal() {
                return Ok(());
            }
            comp.abort(reason);
            comp.assigned_nodes.clone()
        };

        for node_id in &assigned {
            let envelope = Envelope::command(
                "coordinator",
                Message::Abort {
                    computation_id: computation_id.to_string(),
                    reason: reason.to_string(),
                },
            );
            let _ = self.transport.send(node_id, envelope).await;
        }

        self.events.publish(CoordinatorEvent::ComputationAborted {
            computation_id: computation_id.to_string(),
            reason,
        });
        self.release_computation(computation_id).await;
        self.start_next_queued().await?;
        Ok(())
    }

    async fn release_computation(&self, computation_id: &str) {
        let assigned = self
            .computations
            .read()
            .await
            .get(computation_id)
            .map(|c| c.assigned_nodes.clone())
            .unwrap_or_default();
        for node_id in &assigned {
            self.registry.release(node_id, computation_id).await;
        }
        self.share_acks.write().await.remove(computation_id);
        self.outcomes.write().await.remove(computation_id);
        self.templates.write().await.remove(computation_id);
        self.pending_replies
            .write()
            .await
            .retain(|_, p| p.computation_id != computation_id);
    }

    async fn start_next_queued(&self) -> Result<()> {
        if self.active_computation_count().await >= self.config.max_concurrent_computations {
            return Ok(());
        }
        if let Some(next_id) = self.queue.pop().await {
            self.start_computation(&next_id).await?;
        }
        Ok(())
    }

    /// Every 30s (spec §4.4 "Periodic tasks"): ping every connected node.
    pub async fn ping_all(&self) {
        for node in self.registry.snapshot().await {
            if node.state != NodeState::Disconnected {
                let _ = self
                    .transport
                    .send(&node.id, Envelope::command("coordinator", Message::Ping))
                    .await;
            }
        }
    }

    /// Every 10s: mark nodes unresponsive past `node_timeout_ms` as
    /// disconnected, and abort computations past `timeout_at`.
    pub async fn scan_stale_nodes(&self) -> Result<()> {
        let now = node::now_millis();
        let stale = self.registry.stale_since(now, self.config.node_timeout_ms).await;
        for node_id in stale {
            self.disconnect_node(&node_id).await?;
        }
        Ok(())
    }

    pub async fn scan_timeouts(&self) -> Result<()> {
        let now = node::now_millis();
        let expired: Vec<String> = self
            .computations
            .read()
            .await
            .values()
            .filter(|c| !c.state.is_terminal() && c.is_expired(now))
            .map(|c| c.id.clone())
            .collect();
        for id in expired {
            self.abort_computation(&id, AbortReason::Timeout).await?;
        }
        Ok(())
    }

    /// Every 10s, alongside [`Coordinator::scan_timeouts`]: a pending
    /// reply older than `node_timeout_ms` is resent (up to
    /// `MAX_RESPONSE_RETRIES`) if its command is idempotent, otherwise
    /// its computation is aborted with [`AbortReason::ResponseTimeout`]
    /// (spec §4.4 "Transport contract").
    pub async fn scan_response_timeouts(&self) -> Result<()> {
        let now = node::now_millis();
        let timeout_ms = self.config.node_timeout_ms;
        let expired: Vec<(String, PendingReply)> = {
            let mut pending = self.pending_replies.write().await;
            let expired_ids: Vec<String> = pending
                .iter()
                .filter(|(_, p)| timers::is_node_overdue(now, p.sent_at, timeout_ms))
                .map(|(message_id, _)| message_id.clone())
                .collect();
            expired_ids
                .into_iter()
                .filter_map(|message_id| pending.remove(&message_id).map(|p| (message_id, p)))
                .collect()
        };

        for (_, pending) in expired {
            if self
                .get_computation(&pending.computation_id)
                .await
                .map(|c| c.state.is_terminal())
                .unwrap_or(true)
            {
                continue;
            }

            if pending.kind.is_idempotent() && pending.attempts < MAX_RESPONSE_RETRIES {
                let mut peer_addresses = Vec::new();
                if let Some(assigned) = self.assigned_nodes(&pending.computation_id).await {
                    for node_id in &assigned {
                        if let Some(entry) = self.registry.get(node_id).await {
                            peer_addresses.push((entry.id, entry.transport_address));
                        }
                    }
                }
                match pending.kind {
                    PendingKind::Initialize => {
                        self.send_initialize(
                            &pending.computation_id,
                            &pending.node_id,
                            &peer_addresses,
                            pending.attempts + 1,
                        )
                        .await?;
                    }
                }
            } else {
                let err = Error::ResponseTimeout {
                    node_id: pending.node_id.clone(),
                    timeout_ms,
                };
                tracing::warn!(%err, computation_id = %pending.computation_id, "response timed out");
                self.abort_computation(&pending.computation_id, AbortReason::ResponseTimeout)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn get_computation(&self, id: &str) -> Option<Computation> {
        self.computations.read().await.get(id).cloned()
    }

    pub async fn computation_snapshot(&self) -> Vec<Computation> {
        self.computations.read().await.values().cloned().collect()
    }

    /// Recomputes `verify_result` independently of the stored result,
    /// using the same per-node outcomes the aggregator used (spec §4.3
    /// `verify_result`, tolerance `1e-9`).
    pub async fn recheck_result(&self, computation_id: &str) -> Result<bool> {
        let comp = self
            .get_computation(computation_id)
            .await
            .ok_or_else(|| Error::InvalidInput(format!("unknown computation {computation_id}")))?;
        let result = comp
            .result
            .clone()
            .ok_or_else(|| Error::Internal("no result to recheck".into()))?;
        let per_node: Vec<NodeOutcome> = self
            .outcomes
            .read()
            .await
            .get(computation_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        let (template, target_percentile) = self
            .templates
            .read()
            .await
            .get(computation_id)
            .cloned()
            .unwrap_or((SufficientStatistics::Mean { sum: 0.0, n: 0.0 }, 0.5));
        verify_result(&result, &per_node, comp.operation, &template, target_percentile)
    }

    /// The coordinator's single logical event loop (spec §5): serializes
    /// transport events against the two fixed-cadence periodic scans.
    pub async fn run(&self, mut incoming: mpsc::UnboundedReceiver<(String, Envelope)>) {
        let mut ping_tick = tokio::time::interval(timers::PING_INTERVAL);
        let mut timeout_tick = tokio::time::interval(timers::TIMEOUT_SCAN_INTERVAL);
        loop {
            tokio::select! {
                event = incoming.recv() => {
                    match event {
                        Some((node_id, envelope)) => {
                            if let Err(err) = self.handle_event(&node_id, envelope).await {
                                tracing::warn!(%node_id, %err, "failed to handle node event");
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_tick.tick() => {
                    self.ping_all().await;
                }
                _ = timeout_tick.tick() => {
                    if let Err(err) = self.scan_stale_nodes().await {
                        tracing::warn!(%err, "stale-node scan failed");
                    }
                    if let Err(err) = self.scan_timeouts().await {
                        tracing::warn!(%err, "timeout scan failed");
                    }
                    if let Err(err) = self.scan_response_timeouts().await {
                        tracing::warn!(%err, "response-timeout scan failed");
                    }
                }
            }
        }
    }

    /// Prepares and shares one owner's sufficient statistics for
    /// `computation_id`'s already-assigned node set (spec §4.3
    /// `prepare_data`), without transitioning coordinator state, used
    /// by the orchestrator, which owns the per-owner data flow, before
    /// `start_computation` is driven by transport acks.
    pub async fn assigned_nodes(&self, computation_id: &str) -> Option<Vec<String>> {
        self.computations
            .read()
            .await
            .get(computation_id)
            .map(|c| c.assigned_nodes.clone())
    }
}

/// Distributes one owner's already-prepared shares to their respective
/// nodes over `transport`, the L1-to-transport boundary spec §4.4 calls
/// "the coordinator distributes peer addresses during initialize" plus
/// "Nodes may share values directly using the same envelope".
pub async fn distribute_shares(
    transport: &dyn Transport,
    computation_id: &str,
    shares_per_node: HashMap<String, Vec<Share>>,
) -> Result<()> {
    for (node_id, shares) in shares_per_node {
        let envelope = Envelope::command(
            "coordinator",
            Message::Share {
                computation_id: computation_id.to_string(),
                shares,
            },
        );
        transport.send(&node_id, envelope).await?;
    }
    Ok(())
}

/// Convenience wrapper around [`prepare_data`] for callers that only
/// need the share map, keeping the noise/clip/share pipeline in one
/// place for the orchestrator to call per owner.
pub async fn prepare_and_distribute(
    transport: &dyn Transport,
    computation_id: &str,
    stats: &SufficientStatistics,
    operation: Operation,
    node_ids: &[String],
    privacy_params: &PrivacyParameters,
    is_final_aggregation: bool,
    target_percentile: Option<f64>,
) -> Result<()> {
    let prepared = prepare_data(stats, operation, node_ids, privacy_params, is_final_aggregation, target_percentile)?;
    distribute_shares(transport, computation_id, prepared.shares_per_node).await
}
