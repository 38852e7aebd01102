//! Orchestrator (L4, spec §4.6): binds access-proof verification, node
//! selection and share distribution, the coordinator's state machine,
//! and computation-proof issuance into one request-to-result call,
//! generalized from the teacher's `network::p2p::P2PNode::handle_client_request`
//! dispatch, which wired the same four concerns (auth check, peer
//! selection, protocol run, response) behind a single entry point.
//!
//! Nothing here talks to a transport's wire format directly, it drives
//! [`crate::coordinator::Coordinator`] and [`crate::zkp::ZkpVerifier`]
//! through their public APIs, leaving wire concerns to [`crate::coordinator::transport`].

use std::sync::Arc;

use crate::coordinator::{
    distribute_shares, ComputationRequest, ComputationState, Coordinator, EventBus, Transport,
};
use crate::error::{Error, Result};
use crate::protocol::lifecycle::{prepare_data, FinalResult, PrivacyParameters};
use crate::protocol::operation::Operation;
use crate::protocol::statistics::SufficientStatistics;
use crate::zkp::{ProofKind, ProofRecord, ZkpVerifier};

/// One data-owner node's already-computed sufficient statistics for this
/// computation. Turning a node's raw private observations into a
/// [`SufficientStatistics`] value is that node's own responsibility (it
/// never leaves the node); the orchestrator only ever sees the shape the
/// node chose to submit.
pub struct OwnerInput {
    pub node_id: String,
    pub stats: SufficientStatistics,
}

pub struct SubmissionRequest {
    pub session_key: String,
    pub operation: Operation,
    pub protocol: String,
    pub owners: Vec<OwnerInput>,
    pub preferred_nodes: Vec<String>,
    pub protocol_threshold: Option<u32>,
    pub privacy_parameters: PrivacyParameters,
    pub target_percentile: f64,
    /// Must verify against [`ProofKind::Access`] before any node is
    /// contacted (spec §4.5 "a computation never starts without a valid
    /// access proof").
    pub access_proof: ProofRecord,
}

pub struct ComputationOutcome {
    pub computation_id: String,
    pub result: FinalResult,
    pub computation_proof: ProofRecord,
}

/// The single binding point between the cryptographic/statistical
/// engine, the stateful coordinator, and the proof layer.
pub struct Orchestrator {
    coordinator: Arc<Coordinator>,
    transport: Arc<dyn Transport>,
    zkp: Arc<ZkpVerifier>,
}

impl Orchestrator {
    pub fn new(coordinator: Arc<Coordinator>, transport: Arc<dyn Transport>, zkp: Arc<ZkpVerifier>) -> Self {
        Orchestrator {
            coordinator,
            transport,
            zkp,
        }
    }

    /// Verifies the caller's access proof, registers the computation with
    /// the coordinator, and has every owner node distribute its shares.
    /// Returns the new computation's id; call [`Orchestrator::await_result`]
    /// to block on its outcome.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<String> {
        if !self
            .zkp
            .verify_proof(ProofKind::Access, &request.access_proof)
            .await?
        {
            return Err(Error::VerificationFailed(
                "access proof rejected or expired".into(),
            ));
        }

        let template = request
            .owners
            .first()
            .map(|o| o.stats.clone())
            .ok_or_else(|| Error::InvalidInput("submission has no owner data".into()))?;
        let required_nodes: Vec<String> = request.owners.iter().map(|o| o.node_id.clone()).collect();

        let computation_id = self
            .coordinator
            .create_computation(ComputationRequest {
                operation: request.operation,
                session_key: request.session_key,
                protocol: request.protocol,
                required_nodes,
                preferred_nodes: request.preferred_nodes,
                protocol_threshold: request.protocol_threshold,
                privacy_parameters: request.privacy_parameters.clone(),
                stats_template: template,
                target_percentile: request.target_percentile,
            })
            .await?;

        let assigned = self
            .coordinator
            .assigned_nodes(&computation_id)
            .await
            .ok_or_else(|| Error::Internal("computation vanished right after creation".into()))?;

        for owner in &request.owners {
            let prepared = prepare_data(
                &owner.stats,
                request.operation,
                &assigned,
                &request.privacy_parameters,
                false,
                Some(request.target_percentile),
            )?;
            distribute_shares(
                self.transport.as_ref(),
                &computation_id,
                prepared.shares_per_node,
            )
            .await?;
        }

        Ok(computation_id)
    }

    /// Blocks (via the coordinator's event bus, spec §9's "explicit event
    /// bus" redesign) until `computation_id` reaches a terminal state, then
    /// issues a [`ProofKind::Computation`] proof over the final result.
    pub async fn await_result(&self, computation_id: &str) -> Result<ComputationOutcome> {
        let mut receiver = self.coordinator.events.subscribe();
        let lagged = self.coordinator.events.lagged_counter();
        loop {
            let comp = self
                .coordinator
                .get_computation(computation_id)
                .await
                .ok_or_else(|| Error::InvalidInput(format!("unknown computation {computation_id}")))?;

            if comp.state == ComputationState::Completed {
                let result = comp
                    .result
                    .clone()
                    .ok_or_else(|| Error::Internal("completed computation has no result".into()))?;
                let computation_proof = self
                    .zkp
                    .generate_proof(
                        ProofKind::Computation,
                        serde_json::json!({ "computation_id": computation_id }),
                    )
                    .await?;
                return Ok(ComputationOutcome {
                    computation_id: computation_id.to_string(),
                    result,
                    computation_proof,
                });
            }
            if comp.state.is_terminal() {
                return Err(Error::VerificationFailed(format!(
                    "computation {computation_id} ended in {:?}: {:?}",
                    comp.state, comp.abort_reason
                )));
            }

            if EventBus::recv(&mut receiver, &lagged).await.is_none() {
                return Err(Error::Internal(
                    "event bus closed before the computation completed".into(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{CoordinatorConfig, Envelope, InMemoryTransport, Message, NodeCapabilities};
    use crate::protocol::statistics::NoiseMechanism;
    use crate::zkp::prover::mock::MockProver;
    use std::collections::HashSet;

    fn caps() -> NodeCapabilities {
        NodeCapabilities {
            max_concurrent: 4,
            compute_power: 1.0,
        }
    }

    fn privacy_params() -> PrivacyParameters {
        PrivacyParameters::new(1e9, 1e-6, 1e-6, NoiseMechanism::Laplace)
    }

    async fn drive_to_completed(coordinator: &Coordinator, transport: &InMemoryTransport, id: &str, nodes: &[String]) {
        for node_id in nodes {
            let sent = transport.sent_to(node_id).await;
            let init_msg = sent
                .iter()
                .find(|e| matches!(e.payload, Message::Initialize { .. }))
                .unwrap();
            coordinator
                .handle_event(node_id, Envelope::reply(node_id, &init_msg.message_id, Message::Pong))
                .await
                .unwrap();
        }
        for node_id in nodes {
            coordinator
                .handle_event(
                    node_id,
                    Envelope::command(
                        node_id,
                        Message::ShareNotification {
                            computation_id: id.to_string(),
                            from_node: node_id.clone(),
                        },
                    ),
                )
                .await
                .unwrap();
        }
        for node_id in nodes {
            coordinator
                .handle_event(
                    node_id,
                    Envelope::command(
                        node_id,
                        Message::Result {
                            computation_id: id.to_string(),
                            shares: None,
                            result: Some(FinalResult::Scalar(20.0)),
                            weight: 3.0,
                        },
                    ),
                )
                .await
                .unwrap();
        }
        for node_id in nodes {
            coordinator
                .handle_event(
                    node_id,
                    Envelope::command(
                        node_id,
                        Message::VerificationResult {
                            computation_id: id.to_string(),
                            verified: true,
                        },
                    ),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn submit_rejects_expired_or_wrong_kind_proof() {
        let transport = InMemoryTransport::new();
        let coordinator = Arc::new(Coordinator::new(transport.clone(), CoordinatorConfig::default()));
        let mock = Arc::new(MockProver);
        let zkp = Arc::new(ZkpVerifier::new(mock.clone(), mock));
        let orchestrator = Orchestrator::new(coordinator, transport, zkp.clone());

        let ownership_proof = zkp
            .generate_proof(ProofKind::Ownership, serde_json::json!({}))
            .await
            .unwrap();

        let request = SubmissionRequest {
            session_key: "s1".into(),
            operation: Operation::Mean,
            protocol: "mean".into(),
            owners: vec![OwnerInput {
                node_id: "n1".into(),
                stats: SufficientStatistics::Mean { sum: 10.0, n: 1.0 },
            }],
            preferred_nodes: vec![],
            protocol_threshold: None,
            privacy_parameters: privacy_params(),
            target_percentile: 0.5,
            access_proof: ownership_proof,
        };

        let err = orchestrator.submit(request).await.unwrap_err();
        assert!(matches!(err, Error::VerificationFailed(_)));
    }

    #[tokio::test]
    async fn submit_and_await_result_round_trips_a_mean_computation() {
        let transport = InMemoryTransport::new();
        let coordinator = Arc::new(Coordinator::new(transport.clone(), CoordinatorConfig::default()));
        for id in ["n1", "n2", "n3"] {
            transport.connect(id).await;
            coordinator
                .register_node(id, format!("ws://{id}"), caps(), HashSet::from(["mean".to_string()]))
                .await;
        }
        let mock = Arc::new(MockProver);
        let zkp = Arc::new(ZkpVerifier::new(mock.clone(), mock));
        let orchestrator = Orchestrator::new(coordinator.clone(), transport.clone(), zkp.clone());

        let access_proof = zkp
            .generate_proof(ProofKind::Access, serde_json::json!({ "requester": "researcher-1" }))
            .await
            .unwrap();

        let request = SubmissionRequest {
            session_key: "s1".into(),
            operation: Operation::Mean,
            protocol: "mean".into(),
            owners: vec![
                OwnerInput { node_id: "n1".into(), stats: SufficientStatistics::Mean { sum: 10.0, n: 1.0 } },
                OwnerInput { node_id: "n2".into(), stats: SufficientStatistics::Mean { sum: 15.0, n: 1.0 } },
                OwnerInput { node_id: "n3".into(), stats: SufficientStatistics::Mean { sum: 5.0, n: 1.0 } },
            ],
            preferred_nodes: vec![],
            protocol_threshold: Some(2),
            privacy_parameters: privacy_params(),
            target_percentile: 0.5,
            access_proof,
        };

        let computation_id = orchestrator.submit(request).await.unwrap();
        let nodes = coordinator.assigned_nodes(&computation_id).await.unwrap();
        drive_to_completed(&coordinator, &transport, &computation_id, &nodes).await;

        let outcome = orchestrator.await_result(&computation_id).await.unwrap();
        assert!(matches!(outcome.result, FinalResult::Scalar(v) if (v - 20.0).abs() < 1e-9));
        assert!(outcome.computation_proof.expires_at.is_none());
    }
}
