//! Fault-tolerance decisions: whether a computation survives a node
//! disconnect or error, generalized from the teacher's heartbeat-driven
//! peer-timeout detection in `network::p2p` into the threshold-based
//! continue/abort rule of spec.md §4.4 "Fault tolerance".

use super::state::AbortReason;

pub const MAX_NODE_ERRORS: u32 = 3;

/// Decides what happens to a computation after `node_id` drops out,
/// given how many of its originally assigned nodes are still healthy.
///
/// Returns `None` (continue, treating the dropped node's pending share
/// as zero) when `fault_tolerance_enabled` and the survivor count still
/// meets `threshold`; otherwise returns the abort reason.
pub fn on_node_disconnect(
    healthy_after_drop: usize,
    threshold: u32,
    fault_tolerance_enabled: bool,
) -> Option<AbortReason> {
    if fault_tolerance_enabled && healthy_after_drop as u32 >= threshold {
        None
    } else {
        Some(AbortReason::NodeDisconnected)
    }
}

/// Decides whether accumulated node-error reports should abort a
/// computation (spec: "accumulate up to `max_errors` before aborting").
pub fn on_node_error(error_count: u32, max_errors: u32) -> Option<AbortReason> {
    if error_count > max_errors {
        Some(AbortReason::TooManyErrors)
    } else {
        None
    }
}
