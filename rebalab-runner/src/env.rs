//! Environment contract and the historical replay environment.
//!
//! An environment hands out observation windows and applies allocations.
//! `step` never returns `Err`: failures travel in `StepStatus::error` so the
//! backtest loop can end the episode and keep the partial reward.
//!
//! Trading model of `ReplayEnvironment`: at cursor row `c` the allocation is
//! executed at `open[c]` with a proportional fee on the traded value. The
//! post-trade holdings are recorded at row `c` and carried to row `c + 1`.
//! Reward is `ln(V[c+1] / V[c]) − ln(benchmark growth)` where the benchmark
//! is a fee-free constant-rebalance portfolio.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use rebalab_core::domain::{AssetSeries, FiatSeries};
use rebalab_core::error::WindowError;
use rebalab_core::{Allocation, ObservationWindow};

use crate::data::MarketHistory;

/// Environment-side failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("environment was not reset")]
    NotReset,

    #[error("history has {available} rows but {required} are required")]
    NotEnoughData { required: usize, available: usize },

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("portfolio value collapsed to {0}")]
    PortfolioCollapsed(f64),

    #[error("no data beyond the last row")]
    OutOfData,

    #[error("malformed window: {0}")]
    Window(#[from] WindowError),
}

/// Where an episode begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EpisodeStart {
    /// First row with a full observation window.
    Beginning,
    /// Cursor at this row (clamped up to the first full window).
    At(usize),
    /// Uniform over starts that leave at least `min_steps` steps of data.
    Random { seed: u64, min_steps: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepStatus {
    pub out_of_data: bool,
    pub error: Option<EnvError>,
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Window at the new cursor. `None` only when the environment was never reset.
    pub observation: Option<ObservationWindow>,
    pub reward: f64,
    pub done: bool,
    pub status: StepStatus,
}

pub trait Environment: Send + Sync {
    fn fiat(&self) -> &str;

    /// Asset symbols followed by the fiat symbol.
    fn symbols(&self) -> Vec<String>;

    fn n_symbols(&self) -> usize {
        self.symbols().len()
    }

    /// Total rows of history available.
    fn data_length(&self) -> usize;

    /// Rows in each observation window.
    fn obs_steps(&self) -> usize;

    fn reset(&mut self, start: EpisodeStart) -> Result<ObservationWindow, EnvError>;

    fn observe(&self) -> Result<ObservationWindow, EnvError>;

    fn step(&mut self, action: &Allocation) -> StepOutcome;

    /// A fee-free fork whose episodes can span every row of history.
    fn full_history(&self) -> Box<dyn Environment>;

    /// Constant-rebalance weights the reward is measured against.
    fn set_benchmark(&mut self, weights: Allocation) -> Result<(), EnvError>;

    fn benchmark(&self) -> &Allocation;

    /// Independent copy sharing the same history, not yet reset.
    fn fork(&self) -> Box<dyn Environment>;
}

// ─── ReplayEnvironment ───────────────────────────────────────────────

/// Slack allowed on incoming allocations.
const ACTION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
struct Position {
    holdings: Vec<f64>,
    fiat: f64,
}

#[derive(Debug, Clone)]
pub struct ReplayEnvironment {
    history: Arc<MarketHistory>,
    obs_steps: usize,
    fee: f64,
    initial_balance: f64,
    benchmark: Allocation,
    cursor: Option<usize>,
    /// Position held at each row up to the cursor.
    ledger: Vec<Position>,
}

impl ReplayEnvironment {
    pub fn new(
        history: Arc<MarketHistory>,
        obs_steps: usize,
        fee: f64,
        initial_balance: f64,
    ) -> Result<Self, EnvError> {
        let required = obs_steps.max(1) + 1;
        if history.len() < required {
            return Err(EnvError::NotEnoughData {
                required,
                available: history.len(),
            });
        }
        if !(0.0..1.0).contains(&fee) {
            return Err(EnvError::InvalidAction(format!("fee must be in [0, 1), got {fee}")));
        }
        if !(initial_balance > 0.0) {
            return Err(EnvError::InvalidAction(format!(
                "initial balance must be positive, got {initial_balance}"
            )));
        }
        let n_symbols = history.n_assets() + 1;
        Ok(Self {
            history,
            obs_steps: obs_steps.max(1),
            fee,
            initial_balance,
            benchmark: Allocation::bootstrap(n_symbols),
            cursor: None,
            ledger: Vec::new(),
        })
    }

    pub fn history(&self) -> &MarketHistory {
        &self.history
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Portfolio value at the current cursor, before trading.
    pub fn portfolio_value(&self) -> Option<f64> {
        let c = self.cursor?;
        self.ledger.get(c).map(|p| self.value_at(p, c))
    }

    /// Steps left before the cursor reaches the last row.
    pub fn remaining_steps(&self) -> usize {
        self.cursor
            .map(|c| self.history.len().saturating_sub(c + 1))
            .unwrap_or(0)
    }

    fn first_cursor(&self) -> usize {
        self.obs_steps - 1
    }

    fn last_start(&self) -> usize {
        self.history.len().saturating_sub(2)
    }

    fn value_at(&self, position: &Position, row: usize) -> f64 {
        position
            .holdings
            .iter()
            .enumerate()
            .map(|(i, h)| h * self.history.open(i, row))
            .sum::<f64>()
            + position.fiat
    }

    fn window(&self, cursor: usize) -> Result<ObservationWindow, EnvError> {
        let start = cursor + 1 - self.obs_steps;
        let rows = start..=cursor;
        let timestamps = self.history.timestamps()[rows.clone()].to_vec();
        let assets = self
            .history
            .symbols()
            .iter()
            .enumerate()
            .map(|(i, symbol)| AssetSeries {
                symbol: symbol.clone(),
                bars: self.history.bars(i)[rows.clone()].to_vec(),
                holdings: self.ledger[rows.clone()]
                    .iter()
                    .map(|p| p.holdings[i])
                    .collect(),
            })
            .collect();
        let fiat = FiatSeries {
            symbol: self.history.fiat().to_string(),
            balance: self.ledger[rows].iter().map(|p| p.fiat).collect(),
        };
        Ok(ObservationWindow::new(timestamps, assets, fiat)?)
    }

    fn validate_action(&self, action: &Allocation) -> Result<(), EnvError> {
        let n = self.history.n_assets() + 1;
        if action.len() != n {
            return Err(EnvError::InvalidAction(format!(
                "expected {n} weights, got {}",
                action.len()
            )));
        }
        if !action.is_on_simplex(ACTION_TOLERANCE) {
            return Err(EnvError::InvalidAction(format!(
                "weights are not on the simplex: {:?}",
                action.weights()
            )));
        }
        Ok(())
    }

    /// Benchmark growth from row `c` to `c + 1`.
    fn benchmark_growth(&self, c: usize) -> f64 {
        let n = self.history.n_assets();
        (0..n)
            .map(|i| self.benchmark[i] * self.history.open(i, c + 1) / self.history.open(i, c))
            .sum::<f64>()
            + self.benchmark[n]
    }

    fn failed(&self, error: EnvError) -> StepOutcome {
        StepOutcome {
            observation: self.cursor.and_then(|c| self.window(c).ok()),
            reward: 0.0,
            done: true,
            status: StepStatus {
                out_of_data: matches!(error, EnvError::OutOfData),
                error: Some(error),
            },
        }
    }
}

impl Environment for ReplayEnvironment {
    fn fiat(&self) -> &str {
        self.history.fiat()
    }

    fn symbols(&self) -> Vec<String> {
        let mut out = self.history.symbols().to_vec();
        out.push(self.history.fiat().to_string());
        out
    }

    fn data_length(&self) -> usize {
        self.history.len()
    }

    fn obs_steps(&self) -> usize {
        self.obs_steps
    }

    fn reset(&mut self, start: EpisodeStart) -> Result<ObservationWindow, EnvError> {
        let first = self.first_cursor();
        let last = self.last_start();
        let cursor = match start {
            EpisodeStart::Beginning => first,
            EpisodeStart::At(row) => row.max(first),
            EpisodeStart::Random { seed, min_steps } => {
                let hi = self
                    .history
                    .len()
                    .saturating_sub(min_steps + 1)
                    .min(last)
                    .max(first);
                StdRng::seed_from_u64(seed).gen_range(first..=hi)
            }
        };
        if cursor > last {
            return Err(EnvError::NotEnoughData {
                required: cursor + 2,
                available: self.history.len(),
            });
        }

        let n = self.history.n_assets();
        self.ledger = vec![
            Position {
                holdings: vec![0.0; n],
                fiat: self.initial_balance,
            };
            cursor + 1
        ];
        self.cursor = Some(cursor);
        self.window(cursor)
    }

    fn observe(&self) -> Result<ObservationWindow, EnvError> {
        let c = self.cursor.ok_or(EnvError::NotReset)?;
        self.window(c)
    }

    fn step(&mut self, action: &Allocation) -> StepOutcome {
        let Some(c) = self.cursor else {
            return self.failed(EnvError::NotReset);
        };
        if c + 1 >= self.history.len() {
            return self.failed(EnvError::OutOfData);
        }
        if let Err(e) = self.validate_action(action) {
            return self.failed(e);
        }

        let n = self.history.n_assets();
        let current = self.ledger[c].clone();
        let value = self.value_at(&current, c);
        if !(value > 0.0) || !value.is_finite() {
            return self.failed(EnvError::PortfolioCollapsed(value));
        }

        let traded: f64 = (0..n)
            .map(|i| (action[i] * value - current.holdings[i] * self.history.open(i, c)).abs())
            .sum();
        let net = value - self.fee * traded;
        if !(net > 0.0) {
            return self.failed(EnvError::PortfolioCollapsed(net));
        }

        let traded_position = Position {
            holdings: (0..n)
                .map(|i| action[i] * net / self.history.open(i, c))
                .collect(),
            fiat: action[n] * net,
        };
        let next_value = self.value_at(&traded_position, c + 1);
        let reward = (next_value / value).ln() - self.benchmark_growth(c).ln();

        self.ledger[c] = traded_position.clone();
        self.ledger.push(traded_position);
        self.cursor = Some(c + 1);

        let out_of_data = c + 2 >= self.history.len();
        match self.window(c + 1) {
            Ok(observation) => StepOutcome {
                observation: Some(observation),
                reward,
                done: out_of_data,
                status: StepStatus {
                    out_of_data,
                    error: None,
                },
            },
            Err(e) => self.failed(e),
        }
    }

    fn full_history(&self) -> Box<dyn Environment> {
        let mut env = self.clone();
        env.obs_steps = 1;
        env.fee = 0.0;
        env.cursor = None;
        env.ledger.clear();
        Box::new(env)
    }

    fn set_benchmark(&mut self, weights: Allocation) -> Result<(), EnvError> {
        self.validate_action(&weights)?;
        self.benchmark = weights;
        Ok(())
    }

    fn benchmark(&self) -> &Allocation {
        &self.benchmark
    }

    fn fork(&self) -> Box<dyn Environment> {
        let mut env = self.clone();
        env.cursor = None;
        env.ledger.clear();
        Box::new(env)
    }
}
