//! Backtest loop: drives one agent through one episode of an environment.
//!
//! The loop owns the episode boundary: model degeneracies and environment
//! step errors end the episode with the reward accumulated so far, while a
//! `ConfigError` is returned to the caller because no other episode with the
//! same parameters could succeed either. A strategy that needs more rows than
//! the environment's window holds is such an error and is rejected up front.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rebalab_core::{Allocation, ConfigError, RebalancingAgent, StrategyError};

use crate::env::{EnvError, Environment, EpisodeStart};
use crate::search::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOptions {
    /// Stop after this many applied allocations; `None` runs until out of data.
    pub max_steps: Option<usize>,
    pub start: EpisodeStart,
    /// Log every step at `info` level.
    pub verbose: bool,
}

impl Default for EpisodeOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            start: EpisodeStart::Beginning,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Completed,
    OutOfData,
    EnvError(String),
    ModelError(String),
    Cancelled,
}

impl Termination {
    /// True when the episode ended on a failure rather than a boundary.
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::EnvError(_) | Termination::ModelError(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub steps: usize,
    pub total_reward: f64,
    pub rewards: Vec<f64>,
    pub termination: Termination,
    pub final_allocation: Option<Allocation>,
}

impl EpisodeOutcome {
    fn empty(termination: Termination) -> Self {
        Self {
            steps: 0,
            total_reward: 0.0,
            rewards: Vec::new(),
            termination,
            final_allocation: None,
        }
    }

    pub fn mean_reward(&self) -> f64 {
        if self.rewards.is_empty() {
            0.0
        } else {
            self.total_reward / self.rewards.len() as f64
        }
    }
}

/// Run one episode from a fresh agent state.
pub fn run_episode(
    agent: &mut RebalancingAgent,
    env: &mut dyn Environment,
    opts: &EpisodeOptions,
    cancel: Option<&CancellationToken>,
) -> Result<EpisodeOutcome, ConfigError> {
    check_lookback(agent, env)?;
    agent.reset();
    let mut observation = match env.reset(opts.start) {
        Ok(window) => window,
        Err(e) => {
            warn!(error = %e, "environment reset failed");
            return Ok(EpisodeOutcome::empty(Termination::EnvError(e.to_string())));
        }
    };

    let mut outcome = EpisodeOutcome::empty(Termination::Completed);
    loop {
        if opts.max_steps.is_some_and(|max| outcome.steps >= max) {
            outcome.termination = Termination::Completed;
            break;
        }
        if cancel.is_some_and(|c| c.is_cancelled()) {
            outcome.termination = Termination::Cancelled;
            break;
        }

        let action = match agent.rebalance(&observation) {
            Ok(action) => action,
            Err(StrategyError::Config(e)) => return Err(e),
            Err(StrategyError::Degenerate(e)) => {
                warn!(step = outcome.steps, error = %e, "model error, ending episode");
                outcome.termination = Termination::ModelError(e.to_string());
                break;
            }
        };

        let step = env.step(&action);
        if let Some(error) = step.status.error {
            if error == EnvError::OutOfData {
                outcome.termination = Termination::OutOfData;
            } else {
                warn!(step = outcome.steps, error = %error, "environment error, ending episode");
                outcome.termination = Termination::EnvError(error.to_string());
            }
            break;
        }

        outcome.steps += 1;
        outcome.total_reward += step.reward;
        outcome.rewards.push(step.reward);
        outcome.final_allocation = Some(action);
        agent.advance();

        if opts.verbose {
            info!(
                step = outcome.steps,
                reward = step.reward,
                cumulative = outcome.total_reward,
                "episode step"
            );
        }

        if step.done {
            outcome.termination = if step.status.out_of_data {
                Termination::OutOfData
            } else {
                Termination::Completed
            };
            break;
        }
        match step.observation {
            Some(next) => observation = next,
            None => {
                warn!(step = outcome.steps, "environment returned no observation");
                outcome.termination = Termination::EnvError("missing observation".into());
                break;
            }
        }
    }
    Ok(outcome)
}

/// Every window must hold the rows the strategy reads.
pub fn check_lookback(agent: &RebalancingAgent, env: &dyn Environment) -> Result<(), ConfigError> {
    let required = agent.strategy().warmup_rows();
    let available = env.obs_steps();
    if required > available {
        return Err(ConfigError::InvalidValue {
            param: "obs_steps".into(),
            reason: format!(
                "{} needs {required} rows per window but the environment provides {available}",
                agent.strategy().name()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::{generate_synthetic, SyntheticSpec};
    use crate::env::ReplayEnvironment;
    use rebalab_core::domain::SignalVector;
    use rebalab_core::error::DegenerateInputError;
    use rebalab_core::models::SignalModel;
    use rebalab_core::rules::HoldUpdate;
    use rebalab_core::strategy::Strategy;
    use rebalab_core::{
        create_strategy, ObservationWindow, ParamSet, ParamSpec, StrategySpec,
    };

    fn env(rows: usize, obs_steps: usize) -> ReplayEnvironment {
        let spec = SyntheticSpec::new(&["A", "B", "C"], rows, 3);
        let history = generate_synthetic(&spec, "USDT").unwrap();
        ReplayEnvironment::new(Arc::new(history), obs_steps, 0.0, 1.0).unwrap()
    }

    fn agent(kind: &str) -> RebalancingAgent {
        RebalancingAgent::new(create_strategy(&StrategySpec::new(kind)).unwrap())
    }

    #[test]
    fn episode_runs_to_end_of_data() {
        let mut env = env(20, 5);
        let mut agent = agent("pamr");
        let out = run_episode(&mut agent, &mut env, &EpisodeOptions::default(), None).unwrap();
        // cursor starts at row 4 and the last step lands on row 19
        assert_eq!(out.steps, 15);
        assert_eq!(out.termination, Termination::OutOfData);
        assert_eq!(out.rewards.len(), out.steps);
        assert!((out.rewards.iter().sum::<f64>() - out.total_reward).abs() < 1e-12);
        assert_eq!(agent.step(), 15);
    }

    #[test]
    fn max_steps_bounds_the_episode() {
        let mut env = env(30, 5);
        let opts = EpisodeOptions {
            max_steps: Some(7),
            ..EpisodeOptions::default()
        };
        let out = run_episode(&mut agent("olmar"), &mut env, &opts, None).unwrap();
        assert_eq!(out.steps, 7);
        assert_eq!(out.termination, Termination::Completed);
    }

    #[test]
    fn equal_weight_constant_rebalance_matches_default_benchmark() {
        let mut env = env(25, 3);
        let out = run_episode(
            &mut agent("constant_rebalance"),
            &mut env,
            &EpisodeOptions::default(),
            None,
        )
        .unwrap();
        assert!(out.steps > 0);
        for r in &out.rewards {
            assert!(r.abs() < 1e-9, "{r}");
        }
    }

    #[test]
    fn cancelled_token_stops_before_first_step() {
        let token = CancellationToken::new();
        token.cancel();
        let mut env = env(20, 5);
        let out = run_episode(
            &mut agent("pamr"),
            &mut env,
            &EpisodeOptions::default(),
            Some(&token),
        )
        .unwrap();
        assert_eq!(out.steps, 0);
        assert_eq!(out.termination, Termination::Cancelled);
    }

    #[test]
    fn reset_failure_ends_episode_without_reward() {
        let mut env = env(20, 5);
        let opts = EpisodeOptions {
            start: EpisodeStart::At(100),
            ..EpisodeOptions::default()
        };
        let out = run_episode(&mut agent("pamr"), &mut env, &opts, None).unwrap();
        assert!(out.termination.is_failure());
        assert_eq!(out.total_reward, 0.0);
    }

    /// Model that fails from its first real prediction.
    #[derive(Debug, Clone)]
    struct Failing(StrategyError);

    impl SignalModel for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn warmup_rows(&self) -> usize {
            1
        }
        fn predict(&self, _: &ObservationWindow) -> Result<SignalVector, StrategyError> {
            Err(self.0.clone())
        }
        fn param_spec(&self) -> ParamSpec {
            ParamSpec::empty()
        }
        fn set_params(&mut self, _: &ParamSet) -> Result<(), ConfigError> {
            Ok(())
        }
        fn clone_box(&self) -> Box<dyn SignalModel> {
            Box::new(self.clone())
        }
    }

    fn failing_agent(error: StrategyError) -> RebalancingAgent {
        RebalancingAgent::new(Strategy::new(
            "failing",
            Box::new(Failing(error)),
            Box::new(HoldUpdate),
            0,
        ))
    }

    #[test]
    fn config_error_propagates() {
        let mut agent = failing_agent(ConfigError::MissingParam("sensitivity".into()).into());
        let mut env = env(20, 5);
        let err = run_episode(&mut agent, &mut env, &EpisodeOptions::default(), None).unwrap_err();
        assert_eq!(err, ConfigError::MissingParam("sensitivity".into()));
    }

    #[test]
    fn degenerate_input_ends_episode_with_partial_reward() {
        let mut agent = failing_agent(DegenerateInputError::ZeroPortfolioValue.into());
        let mut env = env(20, 5);
        let out = run_episode(&mut agent, &mut env, &EpisodeOptions::default(), None).unwrap();
        // the bootstrap step succeeds before the model is consulted
        assert_eq!(out.steps, 1);
        assert!(matches!(out.termination, Termination::ModelError(_)));
    }

    fn momentum_agent(slow: f64) -> RebalancingAgent {
        let params = ParamSet::new()
            .with("alpha_v", 1.0)
            .with("alpha_a", 1.0)
            .with("mean_type", "simple")
            .with("ma1", 2.0)
            .with("ma2", slow)
            .with("std_span", 3.0);
        let mut agent = agent("momentum");
        agent.set_params(&params).unwrap();
        agent
    }

    #[test]
    fn lookback_longer_than_window_is_a_config_error() {
        let mut env = env(80, 10);
        let short = run_episode(&mut momentum_agent(6.0), &mut env, &EpisodeOptions::default(), None)
            .unwrap();
        assert!(short.steps > 1);

        let err = run_episode(&mut momentum_agent(50.0), &mut env, &EpisodeOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref param, .. } if param == "obs_steps"));
    }

    #[test]
    fn agent_restarts_from_bootstrap_each_episode() {
        let mut env = env(20, 5);
        let mut agent = agent("pamr");
        let first = run_episode(&mut agent, &mut env, &EpisodeOptions::default(), None).unwrap();
        let second = run_episode(&mut agent, &mut env, &EpisodeOptions::default(), None).unwrap();
        assert_eq!(first, second);
    }
}
