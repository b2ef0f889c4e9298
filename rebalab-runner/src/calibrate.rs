//! Two-stage calibration.
//!
//! 1. Benchmark: search constant-rebalance weights `w0..w{n-1}` over the whole
//!    history with a budget `benchmark_budget_factor` times the strategy
//!    budget. Episodes run on the fee-free, single-row-window fork from
//!    `Environment::full_history`, against an equal-weight reference. The
//!    first step holds the equal-weight bootstrap and scores zero, so the
//!    objective is the hindsight log growth from row 1 on. The winner becomes
//!    the environment's benchmark.
//! 2. Strategy: for each candidate from the search space, run `batch_size`
//!    bounded episodes from seeded random starts and score the mean
//!    cumulative reward. Constraint violations (checked on the parameters the
//!    agent would actually run) and parameter errors score `penalty`.
//!
//! Episode starts come from the RNG hierarchy keyed by evaluation number and
//! batch index: each evaluation sees fresh windows, and the result does not
//! depend on thread count. Cancellation returns the best assignment found so
//! far.

use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use rebalab_core::domain::DiagnosticLog;
use rebalab_core::models::{ConstantModel, FactorModel};
use rebalab_core::rng::RngHierarchy;
use rebalab_core::strategy::StrategyKind;
use rebalab_core::{
    create_strategy, Allocation, ConfigError, ParamSet, RebalancingAgent, StrategySpec,
};

use crate::backtest::{run_episode, EpisodeOptions, EpisodeOutcome, Termination};
use crate::env::{EnvError, Environment, EpisodeStart};
use crate::search::{
    CancellationToken, Constraint, OptimizationResult, SearchProgress, SearchSpace,
    SearchSpaceError, SolverKind,
};

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("invalid calibration config: {0}")]
    InvalidConfig(String),

    #[error("search space error: {0}")]
    SearchSpace(#[from] SearchSpaceError),

    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("strategy config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Strategy-stage evaluations.
    pub eval_budget: usize,
    /// Episodes per evaluation.
    pub batch_size: usize,
    /// Steps per episode.
    pub episode_steps: usize,
    pub solver: SolverKind,
    pub seed: u64,
    /// Worker threads for the episodes of one evaluation (1 = sequential).
    pub batch_threads: usize,
    /// Evaluations between progress log lines.
    pub log_interval: usize,
    /// Benchmark budget as a multiple of `eval_budget`; 0 skips the stage.
    pub benchmark_budget_factor: usize,
    /// Score of rejected or invalid candidates.
    pub penalty: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            eval_budget: 200,
            batch_size: 4,
            episode_steps: 30,
            solver: SolverKind::ParticleSwarm,
            seed: 42,
            batch_threads: 1,
            log_interval: 10,
            benchmark_budget_factor: 100,
            penalty: -100.0,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.eval_budget == 0 {
            return Err(CalibrationError::InvalidConfig("eval_budget must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(CalibrationError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.episode_steps == 0 {
            return Err(CalibrationError::InvalidConfig("episode_steps must be > 0".into()));
        }
        if !self.penalty.is_finite() {
            return Err(CalibrationError::InvalidConfig("penalty must be finite".into()));
        }
        Ok(())
    }
}

// ─── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStage {
    Benchmark,
    Strategy,
}

impl std::fmt::Display for CalibrationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationStage::Benchmark => f.write_str("benchmark"),
            CalibrationStage::Strategy => f.write_str("strategy"),
        }
    }
}

/// Snapshot handed to the progress callback after every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationProgress {
    pub stage: CalibrationStage,
    pub evaluation: usize,
    pub budget: usize,
    pub value: f64,
    pub best: Option<f64>,
    pub elapsed_secs: f64,
    pub eta_secs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Constant-rebalance allocation installed as the benchmark.
    pub weights: Allocation,
    pub optimization: OptimizationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkResult>,
    pub optimization: OptimizationResult,
    pub interrupted: bool,
}

// ─── Search spaces ───────────────────────────────────────────────────

/// Weight dimensions a strategy spec implies on its own.
///
/// Only `factor` has any: one `<sub-model>_weight` per injected sub-model.
pub fn implied_search_space(spec: &StrategySpec) -> Result<SearchSpace, ConfigError> {
    let mut space = SearchSpace::new();
    if spec.kind.parse::<StrategyKind>()? == StrategyKind::Factor {
        let factors = spec
            .factors
            .iter()
            .map(rebalab_core::strategy::create_model)
            .collect::<Result<Vec<_>, _>>()?;
        for (name, low, high) in FactorModel::new(factors)?.weight_dimensions() {
            space = space.with_range(&name, low, high);
        }
    }
    Ok(space)
}

fn benchmark_space(n_symbols: usize) -> SearchSpace {
    (0..n_symbols).fold(SearchSpace::new(), |space, i| {
        space.with_range(&ConstantModel::weight_param(i), 0.0, 1.0)
    })
}

// ─── Calibrator ──────────────────────────────────────────────────────

pub type ProgressCallback<'a> = &'a (dyn Fn(&CalibrationProgress) + Sync);

pub struct Calibrator {
    config: CalibrationConfig,
    rng: RngHierarchy,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Calibrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calibrator")
            .field("config", &self.config)
            .field("parallel", &self.pool.is_some())
            .finish()
    }
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Result<Self, CalibrationError> {
        config.validate()?;
        let pool = if config.batch_threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.batch_threads)
                    .build()
                    .map_err(|e| CalibrationError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self {
            rng: RngHierarchy::new(config.seed),
            config,
            pool,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Run both stages and leave `agent` holding the best parameters.
    pub fn fit(
        &self,
        agent: &mut RebalancingAgent,
        env: &mut dyn Environment,
        space: &SearchSpace,
        constraints: &[Constraint],
        cancel: Option<&CancellationToken>,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<CalibrationReport, CalibrationError> {
        space.validate()?;
        let local = CancellationToken::new();
        let cancel = cancel.unwrap_or(&local);

        let benchmark = if self.config.benchmark_budget_factor > 0 {
            let result = self.fit_benchmark(&*env, cancel, progress)?;
            env.set_benchmark(result.weights.clone())?;
            Some(result)
        } else {
            None
        };

        let optimization = self.fit_strategy(agent, &*env, space, constraints, cancel, progress);

        if let Some(best) = optimization.best_value {
            match agent.set_params(&self.candidate_params(agent, &optimization.best_params)) {
                Ok(()) => info!(best, params = %optimization.best_params, "best parameters applied"),
                Err(e) => warn!(error = %e, "best candidate could not be applied"),
            }
        }

        let interrupted = optimization.interrupted
            || benchmark.as_ref().is_some_and(|b| b.optimization.interrupted);
        if interrupted {
            info!(evaluations = optimization.evaluations, "calibration interrupted");
        }
        Ok(CalibrationReport {
            strategy: agent.strategy().name().to_string(),
            dataset_hash: None,
            benchmark,
            optimization,
            interrupted,
        })
    }

    /// Stage 1: best constant-rebalance weights over the full history.
    pub fn fit_benchmark(
        &self,
        env: &dyn Environment,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<BenchmarkResult, CalibrationError> {
        let n_symbols = env.n_symbols();
        let mut full = env.full_history();
        full.set_benchmark(Allocation::bootstrap(n_symbols))?;

        let space = benchmark_space(n_symbols);
        let budget = self
            .config
            .eval_budget
            .saturating_mul(self.config.benchmark_budget_factor);
        let opts = EpisodeOptions {
            max_steps: Some(full.data_length().saturating_sub(full.obs_steps())),
            start: EpisodeStart::Beginning,
            verbose: false,
        };

        let mut search = SearchProgress::new(budget);
        let mut rng = self.solver_rng(CalibrationStage::Benchmark);
        let solver = self.config.solver.build();
        let outcome = solver.maximize(&space.bounds(), budget, &mut rng, cancel, &mut |point: &[f64]| {
            let params = space.decode(point);
            let spec = StrategySpec::new("constant_rebalance").with_params(params.clone());
            let (value, note) = match create_strategy(&spec) {
                Ok(strategy) => {
                    let mut agent = RebalancingAgent::new(strategy);
                    match run_episode(&mut agent, full.as_mut(), &opts, Some(cancel)) {
                        Ok(out) if out.termination == Termination::Cancelled => return None,
                        Ok(out) => (out.total_reward, None),
                        Err(e) => (self.config.penalty, Some(e.to_string())),
                    }
                }
                Err(e) => (self.config.penalty, Some(e.to_string())),
            };
            search.record(params, value, note);
            self.report(CalibrationStage::Benchmark, &search, value, progress);
            Some(value)
        });

        let interrupted = outcome.interrupted;
        let optimization = search.into_result(interrupted);
        let weights = self.benchmark_weights(&*full, &optimization.best_params)?;
        info!(
            weights = ?weights.weights(),
            value = ?optimization.best_value,
            evaluations = optimization.evaluations,
            "benchmark fitted"
        );
        Ok(BenchmarkResult {
            weights,
            optimization,
        })
    }

    /// Stage 2: search strategy parameters.
    pub fn fit_strategy(
        &self,
        agent: &RebalancingAgent,
        env: &dyn Environment,
        space: &SearchSpace,
        constraints: &[Constraint],
        cancel: &CancellationToken,
        progress: Option<ProgressCallback<'_>>,
    ) -> OptimizationResult {
        let budget = self.config.eval_budget;
        let mut search = SearchProgress::new(budget);
        let mut rng = self.solver_rng(CalibrationStage::Strategy);
        let solver = self.config.solver.build();

        let outcome = solver.maximize(&space.bounds(), budget, &mut rng, cancel, &mut |point: &[f64]| {
            let params = space.decode(point);
            let applied = self.candidate_params(agent, &params);
            let (value, note) = if let Some(violated) =
                constraints.iter().find(|c| !c.is_satisfied(&applied))
            {
                debug!(constraint = %violated, params = %applied, "candidate rejected");
                (self.config.penalty, Some(format!("constraint violated: {violated}")))
            } else {
                match self.evaluate(agent, env, &params, search.evaluations, cancel) {
                    Evaluation::Score(v) => (v, None),
                    Evaluation::Invalid(e) => (self.config.penalty, Some(e.to_string())),
                    Evaluation::Cancelled => return None,
                }
            };
            search.record(params, value, note);
            self.report(CalibrationStage::Strategy, &search, value, progress);
            Some(value)
        });
        search.into_result(outcome.interrupted)
    }

    /// Mean cumulative reward of `params` over the batch of episodes.
    ///
    /// `evaluation` selects the episode starts; the same number always
    /// replays the same episodes.
    pub fn evaluate(
        &self,
        agent: &RebalancingAgent,
        env: &dyn Environment,
        params: &ParamSet,
        evaluation: usize,
        cancel: &CancellationToken,
    ) -> Evaluation {
        let mut candidate = agent.clone();
        if let Err(e) = candidate.set_params(&self.candidate_params(agent, params)) {
            return Evaluation::Invalid(e);
        }

        let batch = self.config.batch_size;
        let run = |b: usize| -> Result<EpisodeOutcome, ConfigError> {
            let mut agent = candidate.clone();
            let mut env = env.fork();
            let opts = EpisodeOptions {
                max_steps: Some(self.config.episode_steps),
                start: EpisodeStart::Random {
                    seed: self.rng.sub_seed(
                        "calibration",
                        "episode_start",
                        (evaluation * batch + b) as u64,
                    ),
                    min_steps: self.config.episode_steps,
                },
                verbose: false,
            };
            run_episode(&mut agent, env.as_mut(), &opts, Some(cancel))
        };

        let outcomes: Vec<Result<EpisodeOutcome, ConfigError>> = match &self.pool {
            Some(pool) => pool.install(|| (0..batch).into_par_iter().map(run).collect()),
            None => {
                let mut outcomes = Vec::with_capacity(batch);
                for b in 0..batch {
                    let out = run(b);
                    let stop = match &out {
                        Ok(o) => o.termination == Termination::Cancelled,
                        Err(_) => true,
                    };
                    outcomes.push(out);
                    if stop {
                        break;
                    }
                }
                outcomes
            }
        };

        let mut total = 0.0;
        for outcome in outcomes {
            match outcome {
                Err(e) => return Evaluation::Invalid(e),
                Ok(out) if out.termination == Termination::Cancelled => {
                    return Evaluation::Cancelled
                }
                Ok(out) => total += out.total_reward,
            }
        }
        Evaluation::Score(total / batch as f64)
    }

    fn candidate_params(&self, agent: &RebalancingAgent, params: &ParamSet) -> ParamSet {
        agent.state().params.merged(params)
    }

    fn solver_rng(&self, stage: CalibrationStage) -> StdRng {
        self.rng.rng_for("calibration", &format!("{stage}_solver"), 0)
    }

    /// Allocation the fitted constant-rebalance strategy actually trades.
    fn benchmark_weights(
        &self,
        env: &dyn Environment,
        params: &ParamSet,
    ) -> Result<Allocation, CalibrationError> {
        let n_symbols = env.n_symbols();
        if params.is_empty() {
            return Ok(Allocation::bootstrap(n_symbols));
        }
        let strategy =
            create_strategy(&StrategySpec::new("constant_rebalance").with_params(params.clone()))?;
        let mut probe = env.fork();
        let window = probe.reset(EpisodeStart::Beginning)?;
        let mut log = DiagnosticLog::new();
        match strategy.rebalance(&window, &mut log) {
            Ok(weights) => Ok(weights),
            Err(e) => {
                warn!(error = %e, "benchmark weights unusable, keeping equal weight");
                Ok(Allocation::bootstrap(n_symbols))
            }
        }
    }

    fn report(
        &self,
        stage: CalibrationStage,
        search: &SearchProgress,
        value: f64,
        progress: Option<ProgressCallback<'_>>,
    ) {
        let evaluation = search.evaluations;
        if self.config.log_interval > 0 && evaluation % self.config.log_interval == 0 {
            info!(
                %stage,
                evaluation,
                budget = search.budget,
                value,
                best = ?search.best_value,
                eta_secs = ?search.eta_secs(),
                "calibration progress"
            );
        }
        if let Some(cb) = progress {
            cb(&CalibrationProgress {
                stage,
                evaluation,
                budget: search.budget,
                value,
                best: search.best_value,
                elapsed_secs: search.elapsed_secs(),
                eta_secs: search.eta_secs(),
            });
        }
    }
}

/// Result of scoring one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Score(f64),
    Invalid(ConfigError),
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::{generate_synthetic, SyntheticSpec};
    use crate::env::ReplayEnvironment;

    fn env() -> ReplayEnvironment {
        let spec = SyntheticSpec::new(&["A", "B", "C"], 60, 11).with_drift(&[0.002, 0.0, -0.001]);
        let history = generate_synthetic(&spec, "USDT").unwrap();
        ReplayEnvironment::new(Arc::new(history), 10, 0.0, 1.0).unwrap()
    }

    fn pamr_agent() -> RebalancingAgent {
        let mut agent =
            RebalancingAgent::new(create_strategy(&StrategySpec::new("pamr")).unwrap());
        agent
            .set_params(
                &ParamSet::new()
                    .with("sensitivity", 0.05)
                    .with("variant", "PAMR1")
                    .with("C", 100.0),
            )
            .unwrap();
        agent
    }

    fn config() -> CalibrationConfig {
        CalibrationConfig {
            eval_budget: 12,
            batch_size: 3,
            episode_steps: 15,
            benchmark_budget_factor: 0,
            ..CalibrationConfig::default()
        }
    }

    #[test]
    fn invalid_config_rejected() {
        let bad = CalibrationConfig {
            batch_size: 0,
            ..config()
        };
        assert!(Calibrator::new(bad).is_err());
    }

    #[test]
    fn evaluation_is_deterministic_and_thread_independent() {
        let env = env();
        let agent = pamr_agent();
        let params = ParamSet::new().with("sensitivity", 0.0);
        let cancel = CancellationToken::new();

        let sequential = Calibrator::new(config()).unwrap();
        let parallel = Calibrator::new(CalibrationConfig {
            batch_threads: 3,
            ..config()
        })
        .unwrap();
        let a = sequential.evaluate(&agent, &env, &params, 3, &cancel);
        let b = sequential.evaluate(&agent, &env, &params, 3, &cancel);
        let c = parallel.evaluate(&agent, &env, &params, 3, &cancel);
        assert_eq!(a, b);
        match (a, c) {
            (Evaluation::Score(x), Evaluation::Score(y)) => assert!((x - y).abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_params_score_invalid() {
        let env = env();
        let calibrator = Calibrator::new(config()).unwrap();
        let params = ParamSet::new().with("variant", "PAMR9");
        let out = calibrator.evaluate(&pamr_agent(), &env, &params, 0, &CancellationToken::new());
        assert!(matches!(out, Evaluation::Invalid(ConfigError::UnknownChoice { .. })));
    }

    #[test]
    fn each_evaluation_draws_fresh_episodes() {
        let env = env();
        let calibrator = Calibrator::new(config()).unwrap();
        let params = ParamSet::new().with("sensitivity", 0.0);
        let cancel = CancellationToken::new();
        let scores: Vec<f64> = (0..4)
            .map(|i| match calibrator.evaluate(&pamr_agent(), &env, &params, i, &cancel) {
                Evaluation::Score(v) => v,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert!(scores.windows(2).any(|w| w[0] != w[1]), "{scores:?}");
    }

    fn momentum_agent() -> RebalancingAgent {
        let mut agent =
            RebalancingAgent::new(create_strategy(&StrategySpec::new("momentum")).unwrap());
        agent
            .set_params(
                &ParamSet::new()
                    .with("alpha_v", 1.0)
                    .with("alpha_a", 1.0)
                    .with("mean_type", "simple")
                    .with("ma1", 2.0)
                    .with("ma2", 6.0)
                    .with("std_span", 3.0),
            )
            .unwrap();
        agent
    }

    #[test]
    fn lookback_beyond_window_scores_penalty() {
        let env = env();
        let calibrator = Calibrator::new(config()).unwrap();
        let cancel = CancellationToken::new();
        let agent = momentum_agent();

        let feasible = ParamSet::new().with("ma2", 6.0);
        assert!(matches!(
            calibrator.evaluate(&agent, &env, &feasible, 0, &cancel),
            Evaluation::Score(_)
        ));
        let too_long = ParamSet::new().with("ma2", 50.0);
        assert!(matches!(
            calibrator.evaluate(&agent, &env, &too_long, 0, &cancel),
            Evaluation::Invalid(ConfigError::InvalidValue { .. })
        ));

        let mut env = env;
        let mut agent = agent;
        // simple means need ma2 + 1 rows: only ma2 <= 9 fits a 10-row window
        let space = SearchSpace::new().with_range("ma2", 6.0, 12.0);
        let report = calibrator
            .fit(&mut agent, &mut env, &space, &[], None, None)
            .unwrap();
        let best = report.optimization.best_params.number("ma2").unwrap();
        assert!(best.round() <= 9.0, "infeasible ma2 {best} won");
        for entry in &report.optimization.trace {
            let ma2 = entry.params.number("ma2").unwrap();
            if ma2.round() > 9.0 {
                assert_eq!(entry.value, -100.0);
            }
        }
    }

    #[test]
    fn constraints_see_parameters_fixed_on_the_agent() {
        let mut env = env();
        // C = 100 lives on the agent, only sensitivity is searched
        let mut agent = pamr_agent();
        let calibrator = Calibrator::new(CalibrationConfig {
            eval_budget: 5,
            ..config()
        })
        .unwrap();
        let space = SearchSpace::new().with_range("sensitivity", 0.0, 0.1);
        let constraints = vec!["sensitivity > C".parse::<Constraint>().unwrap()];
        let report = calibrator
            .fit(&mut agent, &mut env, &space, &constraints, None, None)
            .unwrap();
        assert_eq!(report.optimization.trace.len(), 5);
        assert!(report
            .optimization
            .trace
            .iter()
            .all(|t| t.value == -100.0 && t.note.is_some()));
    }

    #[test]
    fn constraint_violations_get_penalty_in_trace() {
        let mut env = env();
        let mut agent = pamr_agent();
        let calibrator = Calibrator::new(config()).unwrap();
        let space = SearchSpace::new().with_range("sensitivity", 0.0, 0.1);
        let constraints = vec!["sensitivity > 0.2".parse::<Constraint>().unwrap()];
        let report = calibrator
            .fit(&mut agent, &mut env, &space, &constraints, None, None)
            .unwrap();
        assert_eq!(report.optimization.evaluations, 12);
        assert!(report
            .optimization
            .trace
            .iter()
            .all(|t| t.value == -100.0 && t.note.is_some()));
    }

    #[test]
    fn benchmark_stage_installs_weights() {
        let mut env = env();
        let mut agent = pamr_agent();
        let calibrator = Calibrator::new(CalibrationConfig {
            eval_budget: 4,
            benchmark_budget_factor: 5,
            solver: SolverKind::RandomSearch,
            ..config()
        })
        .unwrap();
        let space = SearchSpace::new().with_range("sensitivity", 0.0, 0.1);
        let report = calibrator
            .fit(&mut agent, &mut env, &space, &[], None, None)
            .unwrap();
        let benchmark = report.benchmark.unwrap();
        assert_eq!(benchmark.optimization.evaluations, 20);
        assert!(benchmark.weights.is_on_simplex(1e-9));
        assert_eq!(env.benchmark(), &benchmark.weights);
        assert!(!report.interrupted);
    }

    #[test]
    fn progress_callback_sees_every_evaluation() {
        let mut env = env();
        let mut agent = pamr_agent();
        let calibrator = Calibrator::new(config()).unwrap();
        let space = SearchSpace::new().with_range("sensitivity", 0.0, 0.1);
        let seen = std::sync::Mutex::new(Vec::new());
        let cb = |p: &CalibrationProgress| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(p.evaluation);
            }
        };
        calibrator
            .fit(&mut agent, &mut env, &space, &[], None, Some(&cb))
            .unwrap();
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn factor_spec_implies_weight_dimensions() {
        let mut spec = StrategySpec::new("factor");
        spec.factors = vec![StrategySpec::new("pamr"), StrategySpec::new("olmar")];
        let space = implied_search_space(&spec).unwrap();
        assert_eq!(space.len(), 2);
        assert!(space.get("pamr_weight").is_some());
        assert!(implied_search_space(&StrategySpec::new("pamr")).unwrap().is_empty());
    }
}
