//! Rebalab Core: online portfolio selection strategies.
//!
//! This crate contains the pure, synchronous part of the system:
//! - Domain types (observation windows, allocations, parameters, diagnostics)
//! - Simplex projection and portfolio-vector extraction
//! - Moving-average, volatility and extrema indicators
//! - Signal models and update rules, composed into strategies
//! - The rebalancing agent and the deterministic RNG hierarchy

pub mod agent;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod models;
pub mod numeric;
pub mod portfolio;
pub mod projection;
pub mod rng;
pub mod rules;
pub mod strategy;

pub use agent::{AgentState, RebalancingAgent};
pub use domain::{Allocation, ObservationWindow, ParamSet, ParamSpec, ParamValue};
pub use error::{ConfigError, DegenerateInputError, StrategyError, WindowError};
pub use projection::project_simplex;
pub use strategy::{create_strategy, Strategy, StrategySpec};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: agents and strategies can move to worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<RebalancingAgent>();
        require_sync::<RebalancingAgent>();
        require_send::<Strategy>();
        require_sync::<Strategy>();
        require_send::<ObservationWindow>();
        require_sync::<ObservationWindow>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
    }
}
