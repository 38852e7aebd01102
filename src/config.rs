//! Coordinator configuration (spec §6): `listen_host`, `listen_port`,
//! `min_nodes`, `node_timeout_ms`, `computation_timeout_ms`,
//! `max_concurrent_computations`, `fault_tolerance_enabled`.
//!
//! Grounded on `chainflip-io-chainflip-backend/engine/src/settings.rs`'s
//! `Settings::new` pattern: a default file merged with environment
//! overrides via the `config` crate, deserialized once at startup into a
//! typed struct rather than read ad hoc at each call site.

use serde::Deserialize;

use crate::coordinator::CoordinatorConfig;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_min_nodes")]
    pub min_nodes: usize,
    #[serde(default = "default_max_nodes_per_computation")]
    pub max_nodes_per_computation: usize,
    #[serde(default = "default_node_timeout_ms")]
    pub node_timeout_ms: u64,
    #[serde(default = "default_computation_timeout_ms")]
    pub computation_timeout_ms: u64,
    #[serde(default = "default_max_concurrent_computations")]
    pub max_concurrent_computations: usize,
    #[serde(default = "default_fault_tolerance_enabled")]
    pub fault_tolerance_enabled: bool,
    /// Per-session-key cumulative epsilon ceiling (spec §4.4
    /// `BudgetExhausted`). Unbounded by default; deployments that want
    /// the budget enforced set `SMPC_SESSION_EPSILON_BUDGET`.
    #[serde(default = "default_session_epsilon_budget")]
    pub session_epsilon_budget: f64,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}
fn default_listen_port() -> u16 {
    8080
}
fn default_min_nodes() -> usize {
    2
}
fn default_max_nodes_per_computation() -> usize {
    10
}
fn default_node_timeout_ms() -> u64 {
    30_000
}
fn default_computation_timeout_ms() -> u64 {
    300_000
}
fn default_max_concurrent_computations() -> usize {
    16
}
fn default_fault_tolerance_enabled() -> bool {
    true
}
fn default_session_epsilon_budget() -> f64 {
    f64::INFINITY
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            min_nodes: default_min_nodes(),
            max_nodes_per_computation: default_max_nodes_per_computation(),
            node_timeout_ms: default_node_timeout_ms(),
            computation_timeout_ms: default_computation_timeout_ms(),
            max_concurrent_computations: default_max_concurrent_computations(),
            fault_tolerance_enabled: default_fault_tolerance_enabled(),
            session_epsilon_budget: default_session_epsilon_budget(),
        }
    }
}

impl Settings {
    /// Loads `config/default.toml` (if present) merged with `SMPC_*`
    /// environment overrides, e.g. `SMPC_NODE_TIMEOUT_MS=60000`. Missing
    /// files and missing env vars both fall back to the defaults above.
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("SMPC").separator("_"));
        let raw = builder.build()?;
        Ok(raw.try_deserialize()?)
    }

    pub fn to_coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            min_nodes: self.min_nodes,
            max_nodes_per_computation: self.max_nodes_per_computation,
            node_timeout_ms: self.node_timeout_ms,
            computation_timeout_ms: self.computation_timeout_ms,
            max_concurrent_computations: self.max_concurrent_computations,
            fault_tolerance_enabled: self.fault_tolerance_enabled,
            session_epsilon_budget: self.session_epsilon_budget,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}
