//! Pure timing helpers behind the periodic scans in [`super::Coordinator::run`]:
//! default intervals and the overdue checks applied to each tick,
//! generalized from the teacher's `heartbeat_interval` /
//! `elapsed() > heartbeat_interval * 3` timeout check in `network::p2p`.

use std::time::Duration;

/// Coordinator-to-node liveness pings (spec §5 "30s ping interval").
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Computation/node timeout sweep (spec §5 "10s timeout-scan interval").
pub const TIMEOUT_SCAN_INTERVAL: Duration = Duration::from_secs(10);

pub fn is_node_overdue(now_millis: u64, last_seen_millis: u64, node_timeout_ms: u64) -> bool {
    now_millis.saturating_sub(last_seen_millis) > node_timeout_ms
}

pub fn is_computation_overdue(now_millis: u64, timeout_at_millis: u64) -> bool {
    now_millis > timeout_at_millis
}
