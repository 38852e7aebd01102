//! The coordinator's read-only HTTP surface (spec §6): `GET /health` and
//! `GET /status`, and nothing else; every other path is a 404. No CLI
//! ships as part of this crate's core.
//!
//! Generalized from the teacher's `network::http::HttpServer`, which
//! wires a much larger CRUD surface (node/session/key management) behind
//! a hand-rolled `RouteHandler` registry; this crate needs only the two
//! status endpoints spec §6 names, built on an ordinary `axum::Router`
//! rather than the teacher's string-keyed handler map (spec §9's "typed
//! variants" redesign flag applies to the coordinator's command/event
//! layer, not this thin read-only surface).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::coordinator::Coordinator;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    nodes: usize,
    active_computations: usize,
}

#[derive(Serialize)]
struct NodeStatus {
    id: String,
    state: crate::coordinator::NodeState,
    active: usize,
}

#[derive(Serialize)]
struct ComputationStatus {
    id: String,
    state: crate::coordinator::ComputationState,
    #[serde(rename = "type")]
    operation: crate::protocol::Operation,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    nodes: Vec<NodeStatus>,
    active_computations: Vec<ComputationStatus>,
}

async fn health(State(coordinator): State<Arc<Coordinator>>) -> impl IntoResponse {
    let nodes = coordinator.registry.snapshot().await;
    let active = coordinator.active_computation_count().await;
    Json(HealthResponse {
        status: "ok",
        nodes: nodes.len(),
        active_computations: active,
    })
}

async fn status(State(coordinator): State<Arc<Coordinator>>) -> impl IntoResponse {
    let nodes = coordinator
        .registry
        .snapshot()
        .await
        .into_iter()
        .map(|n| NodeStatus {
            id: n.id,
            state: n.state,
            active: n.active_computations.len(),
        })
        .collect();
    let active_computations = coordinator
        .computation_snapshot()
        .await
        .into_iter()
        .filter(|c| !c.state.is_terminal())
        .map(|c| ComputationStatus {
            id: c.id,
            state: c.state,
            operation: c.operation,
        })
        .collect();
    Json(StatusResponse {
        status: "ok",
        nodes,
        active_computations,
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

/// Builds the router; the caller (typically [`crate::bin`]'s
/// `smpc-coordinatord`) supplies the bound listener.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(coordinator)
}
