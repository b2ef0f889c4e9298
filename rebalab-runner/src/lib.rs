//! Rebalab Runner: everything around a rebalancing agent.
//!
//! This crate builds on `rebalab-core` to provide:
//! - Market history from CSV or a seeded synthetic generator
//! - The environment contract and a historical replay environment
//! - The backtest loop with cooperative cancellation
//! - Search spaces, constraints and black-box maximizers
//! - Two-stage calibration (benchmark, then strategy parameters)
//! - TOML run configuration and JSON report export

pub mod backtest;
pub mod calibrate;
pub mod config;
pub mod data;
pub mod env;
pub mod export;
pub mod search;

pub use backtest::{check_lookback, run_episode, EpisodeOptions, EpisodeOutcome, Termination};
pub use calibrate::{
    implied_search_space, BenchmarkResult, CalibrationConfig, CalibrationError,
    CalibrationProgress, CalibrationReport, CalibrationStage, Calibrator, Evaluation,
};
pub use config::{RunConfig, RunConfigError, RunId};
pub use data::{
    generate_synthetic, load_csv, write_csv, LoadError, MarketHistory, SyntheticSpec,
};
pub use env::{
    EnvError, Environment, EpisodeStart, ReplayEnvironment, StepOutcome, StepStatus,
};
pub use export::{import_json, read_params, write_report, ReportFile, SCHEMA_VERSION};
pub use search::{
    CancellationToken, Constraint, Dimension, Maximizer, OptimizationResult, ParticleSwarm,
    RandomSearch, SearchProgress, SearchSpace, SearchSpaceError, SolverKind, TraceEntry,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn environments_are_send_sync() {
        assert_send::<ReplayEnvironment>();
        assert_sync::<ReplayEnvironment>();
        assert_send::<Box<dyn Environment>>();
    }

    #[test]
    fn calibration_types_are_send_sync() {
        assert_send::<Calibrator>();
        assert_sync::<Calibrator>();
        assert_send::<CalibrationReport>();
        assert_sync::<CancellationToken>();
        assert_sync::<MarketHistory>();
    }
}
