//! Rebalancing agent: a strategy plus its per-lifetime state.
//!
//! Step 0 always returns the bootstrap allocation (uniform over assets,
//! fiat 0) without consulting the strategy. Later steps run the strategy.
//! The caller advances the step counter once the allocation has been applied.

use serde::{Deserialize, Serialize};

use crate::domain::{Allocation, DiagnosticLog, ObservationWindow, ParamSet};
use crate::error::{ConfigError, StrategyError};
use crate::strategy::Strategy;

/// Mutable state owned by one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub step: u64,
    pub log: DiagnosticLog,
    /// Parameters last applied through `set_params`.
    pub params: ParamSet,
}

#[derive(Debug, Clone)]
pub struct RebalancingAgent {
    strategy: Strategy,
    state: AgentState,
}

impl RebalancingAgent {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            state: AgentState::default(),
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn step(&self) -> u64 {
        self.state.step
    }

    /// Allocation for the current step.
    pub fn rebalance(&mut self, window: &ObservationWindow) -> Result<Allocation, StrategyError> {
        self.state.log.record("step", self.state.step as f64);
        if self.state.step == 0 {
            return Ok(Allocation::bootstrap(window.n_symbols()));
        }
        self.strategy.rebalance(window, &mut self.state.log)
    }

    pub fn advance(&mut self) {
        self.state.step += 1;
    }

    /// Start a new episode: step 0, empty log. Parameters are kept.
    pub fn reset(&mut self) {
        self.state.step = 0;
        self.state.log.clear();
    }

    pub fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.strategy.set_params(params)?;
        self.state.params = params.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SIMPLEX_TOLERANCE;

    fn window() -> ObservationWindow {
        ObservationWindow::from_opens(
            &["A", "B", "C"],
            "USDT",
            &[vec![10.0, 11.0], vec![5.0, 4.0], vec![2.0, 2.0]],
            &[0.0, 0.0, 0.0],
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn step_zero_is_bootstrap() {
        let mut agent = RebalancingAgent::new(Strategy::pamr());
        let a = agent.rebalance(&window()).unwrap();
        assert_eq!(a.weights(), &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0]);
        assert_eq!(agent.state().log.number("step"), Some(0.0));
    }

    #[test]
    fn later_steps_run_the_strategy() {
        let mut agent = RebalancingAgent::new(Strategy::pamr());
        agent.rebalance(&window()).unwrap();
        agent.advance();
        let a = agent.rebalance(&window()).unwrap();
        assert!(a.is_on_simplex(SIMPLEX_TOLERANCE));
        assert!(agent.state().log.number("lambda").is_some());
    }

    #[test]
    fn reset_returns_to_bootstrap_but_keeps_params() {
        let mut agent = RebalancingAgent::new(Strategy::stmr());
        let params = ParamSet::new().with("sensitivity", 0.1).with("std_window", 4.0);
        agent.set_params(&params).unwrap();
        agent.advance();
        agent.reset();
        assert_eq!(agent.step(), 0);
        assert_eq!(agent.state().params, params);
    }

    #[test]
    fn failed_set_params_keeps_previous_params() {
        let mut agent = RebalancingAgent::new(Strategy::stmr());
        assert!(agent
            .set_params(&ParamSet::new().with("bogus", 1.0))
            .is_err());
        assert!(agent.state().params.is_empty());
    }
}
