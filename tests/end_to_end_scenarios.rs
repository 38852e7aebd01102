//! End-to-end scenarios from spec §8, driven through the public crate
//! API against an in-memory transport.

use std::collections::HashSet;
use std::sync::Arc;

use smpc_core::coordinator::{
    AbortReason, ComputationRequest, ComputationState, Coordinator, CoordinatorConfig, Envelope,
    InMemoryTransport, Message, NodeCapabilities,
};
use smpc_core::protocol::lifecycle::{FinalResult, PrivacyParameters};
use smpc_core::protocol::{NoiseMechanism, Operation, SufficientStatistics};

fn caps() -> NodeCapabilities {
    NodeCapabilities {
        max_concurrent: 4,
        compute_power: 1.0,
    }
}

fn no_noise_params() -> PrivacyParameters {
    PrivacyParameters::new(1e9, 1e-6, 1e-6, NoiseMechanism::Laplace)
}

async fn coordinator_with_nodes(ids: &[&str]) -> (Arc<Coordinator>, Arc<InMemoryTransport>) {
    let transport = InMemoryTransport::new();
    let coordinator = Arc::new(Coordinator::new(transport.clone(), CoordinatorConfig::default()));
    for id in ids {
        transport.connect(id).await;
        coordinator
            .register_node(*id, format!("ws://{id}"), caps(), HashSet::from(["mean".to_string()]))
            .await;
    }
    (coordinator, transport)
}

async fn ack_initialize(coordinator: &Coordinator, transport: &InMemoryTransport, node_id: &str) {
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

/// Scenario 3 (adapted): the coordinator's own threshold is the
/// stricter `ceil(n/2)+1` (spec §9, it wins over any caller-requested
/// protocol threshold), so with six nodes that resolves to 4; two
/// nodes can still drop before the result and the computation
/// completes on the four survivors.
#[tokio::test]
async fn node_drop_above_threshold_still_completes() {
    let (coordinator, transport) =
        coordinator_with_nodes(&["n1", "n2", "n3", "n4", "n5", "n6"]).await;
    let id = coordinator
        .create_computation(ComputationRequest {
            operation: Operation::Mean,
            session_key: "s1".into(),
            protocol: "mean".into(),
            required_nodes: vec![],
            preferred_nodes: vec![],
            protocol_threshold: Some(3),
            privacy_parameters: no_noise_params(),
            stats_template: SufficientStatistics::Mean { sum: 0.0, n: 0.0 },
            target_percentile: 0.5,
        })
        .await
        .unwrap();
    let nodes = coordinator.assigned_nodes(&id).await.unwrap();
    assert_eq!(nodes.len(), 6);
    assert_eq!(coordinator.get_computation(&id).await.unwrap().threshold, 4);

    for node_id in &nodes {
        ack_initialize(&coordinator, &transport, node_id).await;
    }

    // Two nodes drop after initialize but before any share notification;
    // four healthy nodes still meet the threshold of 4.
    coordinator.disconnect_node(&nodes[4]).await.unwrap();
    coordinator.disconnect_node(&nodes[5]).await.unwrap();
    let comp = coordinator.get_computation(&id).await.unwrap();
    assert_ne!(comp.state, ComputationState::Aborted);

    let survivors = &nodes[0..4];
    for node_id in survivors {
        coordinator
            .handle_event(
                node_id,
                Envelope::command(
                    node_id,
                    Message::ShareNotification {
                        computation_id: id.clone(),
                        from_node: node_id.clone(),
                    },
                ),
            )
            .await
            .unwrap();
    }
    for node_id in survivors {
        coordinator
            .handle_event(
                node_id,
                Envelope::command(
                    node_id,
                    Message::Result {
                        computation_id: id.clone(),
                        shares: None,
                        result: Some(FinalResult::Scalar(20.0)),
                        weight: 3.0,
                    },
                ),
            )
            .await
            .unwrap();
    }
    for node_id in survivors {
        coordinator
            .handle_event(
                node_id,
                Envelope::command(
                    node_id,
                    Message::VerificationResult {
                        computation_id: id.clone(),
                        verified: true,
                    },
                ),
            )
            .await
            .unwrap();
    }

    let comp = coordinator.get_computation(&id).await.unwrap();
    assert_eq!(comp.state, ComputationState::Completed);
    assert!(matches!(comp.result, Some(FinalResult::Scalar(v)) if (v - 20.0).abs() < 1e-9));
}

/// Scenario 4: three nodes, threshold 3; one node drops after initialize,
/// leaving only two healthy, below threshold, so the computation aborts.
#[tokio::test]
async fn node_drop_below_threshold_aborts() {
    let (coordinator, transport) = coordinator_with_nodes(&["n1", "n2", "n3"]).await;
    let id = coordinator
        .create_computation(ComputationRequest {
            operation: Operation::Mean,
            session_key: "s1".into(),
            protocol: "mean".into(),
            required_nodes: vec![],
            preferred_nodes: vec![],
            protocol_threshold: Some(3),
            privacy_parameters: no_noise_params(),
            stats_template: SufficientStatistics::Mean { sum: 0.0, n: 0.0 },
            target_percentile: 0.5,
        })
        .await
        .unwrap();
    let nodes = coordinator.assigned_nodes(&id).await.unwrap();
    for node_id in &nodes {
        ack_initialize(&coordinator, &transport, node_id).await;
    }

    coordinator.disconnect_node(&nodes[0]).await.unwrap();

    let comp = coordinator.get_computation(&id).await.unwrap();
    assert_eq!(comp.state, ComputationState::Aborted);
    assert_eq!(comp.abort_reason, Some(AbortReason::NodeDisconnected));
}

/// Scenario 6: three owners each contribute a 10-bucket histogram over
/// 10 draws in [0, 100); totals are preserved through share-level
/// aggregation and reconstruction.
#[tokio::test]
async fn histogram_preserves_total_count_across_owners() {
    use smpc_core::protocol::lifecycle::{aggregate_results, prepare_data, process_share_at_node, NodeOutcome, ShareResult};

    let node_ids = vec!["n1".to_string(), "n2".to_string(), "n3".to_string()];
    let params = no_noise_params();
    let owners: Vec<Vec<f64>> = vec![
        (0..10).map(|i| (i * 7 % 100) as f64).collect(),
        (0..10).map(|i| (i * 13 % 100) as f64).collect(),
        (0..10).map(|i| (i * 19 % 100) as f64).collect(),
    ];

    // One share map per owner: `per_owner_shares[o][node_id]` is owner
    // `o`'s share vector for `node_id`.
    let per_owner_shares: Vec<std::collections::HashMap<String, Vec<smpc_core::secret_sharing::Share>>> = owners
        .iter()
        .map(|draws| {
            let stats = smpc_core::protocol::histogram_from_raw(draws, 0.0, 100.0, 10);
            prepare_data(&stats, Operation::Histogram, &node_ids, &params, false, None)
                .unwrap()
                .shares_per_node
        })
        .collect();

    let histogram_template = SufficientStatistics::Histogram { counts: vec![0.0; 10] };
    let metadata = smpc_core::protocol::lifecycle::Metadata {
        operation: Operation::Histogram,
        threshold: 2,
        node_count: node_ids.len() as u32,
        is_final_aggregation: false,
        privacy_params: params.clone(),
        target_percentile: 0.5,
    };

    // Each node sums its own (owner 0's) share with the shares relayed
    // from the other two owners into one intermediate share vector.
    let mut outcomes = Vec::new();
    for node_id in &node_ids {
        let own = per_owner_shares[0].get(node_id).unwrap().clone();
        let peers: Vec<Vec<smpc_core::secret_sharing::Share>> = per_owner_shares[1..]
            .iter()
            .map(|owner_shares| owner_shares.get(node_id).unwrap().clone())
            .collect();
        let result = process_share_at_node(&own, &peers, &histogram_template, &metadata).unwrap();
        match result {
            ShareResult::Intermediate(shares) => outcomes.push(NodeOutcome::Shares(shares, 1.0)),
            ShareResult::Final(_) => panic!("expected intermediate result"),
        }
    }

    let aggregated = aggregate_results(&outcomes, Operation::Histogram, &histogram_template, 0.5).unwrap();
    match aggregated {
        FinalResult::Vector(counts) => {
            let total: f64 = counts.iter().sum();
            assert!((total - 30.0).abs() < 1e-9);
        }
        other => panic!("expected a vector result, got {other:?}"),
    }
}
