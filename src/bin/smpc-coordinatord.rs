//! Coordinator daemon: loads configuration, starts the HTTP status
//! surface, and drives the coordinator's event loop against an
//! in-process transport until an inbound connection registers nodes.
//!
//! Grounded on `network::http::HttpServer::start`'s
//! `TcpListener::bind` + serve-loop shape, generalized to axum's
//! `axum::serve` (as `oprf-service-example.rs` and `tinyzkp_api.rs`
//! both do) rather than the teacher's hand-rolled accept loop.

use std::sync::Arc;

use smpc_core::coordinator::{Coordinator, InMemoryTransport};
use smpc_core::{config::Settings, http, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let settings = Settings::load()?;
    tracing::info!(addr = %settings.listen_addr(), "starting smpc-coordinatord");

    // `coordinator::WebSocketTransport` dials out to a node's registered
    // `transport_address` once it knows one; this skeleton binary has no
    // admin surface yet to supply node addresses at startup, so it runs
    // its event loop over the in-memory transport until that wiring
    // lands (see DESIGN.md).
    let transport = InMemoryTransport::new();
    let coordinator = Arc::new(Coordinator::new(transport, settings.to_coordinator_config()));

    let (_incoming_tx, incoming_rx) = tokio::sync::mpsc::unbounded_channel();
    let event_loop_coordinator = coordinator.clone();
    let event_loop = tokio::spawn(async move {
        event_loop_coordinator.run(incoming_rx).await;
    });

    let app = http::router(coordinator);
    let listener = tokio::net::TcpListener::bind(settings.listen_addr()).await?;
    tracing::info!("listening for status requests");
    axum::serve(listener, app).await?;

    event_loop.abort();
    Ok(())
}
