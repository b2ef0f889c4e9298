//! `RunConfig`: the TOML document behind `rebalab calibrate` and `rebalab backtest`.
//!
//! Search spaces are written inline under `[calibration.search_space]`:
//! a two-element numeric array is a bounded range, a table is a categorical
//! choice whose keys are option names and whose values are nested
//! sub-spaces, and a scalar is a fixed value.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rebalab_core::{create_strategy, ConfigError, ParamValue, RebalancingAgent, StrategySpec};

use crate::calibrate::{implied_search_space, CalibrationConfig};
use crate::data::{generate_synthetic, load_csv, LoadError, MarketHistory, SyntheticSpec};
use crate::env::{EnvError, ReplayEnvironment};
use crate::search::{Constraint, Dimension, SearchSpace, SearchSpaceError};

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    SearchSpace(#[from] SearchSpaceError),

    #[error(transparent)]
    Strategy(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Env(#[from] EnvError),
}

// ─── Sections ────────────────────────────────────────────────────────

fn default_fiat() -> String {
    "USDT".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    /// Long-format price CSV, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic: Option<SyntheticSpec>,
    #[serde(default = "default_fiat")]
    pub fiat: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSection {
    pub obs_steps: usize,
    pub fee: f64,
    pub initial_balance: f64,
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            obs_steps: 30,
            fee: 0.0025,
            initial_balance: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSection {
    #[serde(flatten)]
    pub settings: CalibrationConfig,
    pub constraints: Vec<String>,
    pub search_space: toml::Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub data: DataSection,
    #[serde(default)]
    pub environment: EnvironmentSection,
    pub strategy: StrategySpec,
    #[serde(default)]
    pub calibration: CalibrationSection,
    #[serde(default)]
    pub logging: LoggingSection,
    /// Directory relative data paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        match (&self.data.csv, &self.data.synthetic) {
            (Some(_), Some(_)) => {
                return Err(RunConfigError::Invalid(
                    "[data] takes either `csv` or `synthetic`, not both".into(),
                ))
            }
            (None, None) => {
                return Err(RunConfigError::Invalid(
                    "[data] needs `csv` or `synthetic`".into(),
                ))
            }
            _ => {}
        }
        create_strategy(&self.strategy)?;
        self.search_space()?.validate()?;
        self.constraints()?;
        Ok(())
    }

    /// Deterministic hash of the configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn calibration_config(&self) -> CalibrationConfig {
        self.calibration.settings.clone()
    }

    /// Configured space merged over the dimensions the strategy implies.
    pub fn search_space(&self) -> Result<SearchSpace, RunConfigError> {
        let configured = parse_space(&self.calibration.search_space, "")?;
        Ok(implied_search_space(&self.strategy)?.merged(configured))
    }

    pub fn constraints(&self) -> Result<Vec<Constraint>, RunConfigError> {
        Ok(self
            .calibration
            .constraints
            .iter()
            .map(|c| c.parse())
            .collect::<Result<Vec<Constraint>, _>>()?)
    }

    pub fn load_history(&self) -> Result<MarketHistory, RunConfigError> {
        if let Some(spec) = &self.data.synthetic {
            return Ok(generate_synthetic(spec, &self.data.fiat)?);
        }
        let Some(csv) = &self.data.csv else {
            return Err(RunConfigError::Invalid("no data source configured".into()));
        };
        let path = match &self.base_dir {
            Some(dir) if csv.is_relative() => dir.join(csv),
            _ => csv.clone(),
        };
        Ok(load_csv(&path, &self.data.fiat)?)
    }

    pub fn build_environment(
        &self,
        history: Arc<MarketHistory>,
    ) -> Result<ReplayEnvironment, RunConfigError> {
        Ok(ReplayEnvironment::new(
            history,
            self.environment.obs_steps,
            self.environment.fee,
            self.environment.initial_balance,
        )?)
    }

    /// Agent for the configured strategy with its parameters applied.
    pub fn build_agent(&self) -> Result<RebalancingAgent, RunConfigError> {
        let mut agent = RebalancingAgent::new(create_strategy(&self.strategy)?);
        if !self.strategy.params.is_empty() {
            agent.set_params(&self.strategy.params)?;
        }
        Ok(agent)
    }
}

// ─── Search-space encoding ───────────────────────────────────────────

fn parse_space(table: &toml::Table, prefix: &str) -> Result<SearchSpace, SearchSpaceError> {
    let mut space = SearchSpace::new();
    for (name, value) in table {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        let unsupported = |reason: &str| SearchSpaceError::Unsupported {
            name: path.clone(),
            reason: reason.to_string(),
        };
        let dimension = match value {
            toml::Value::Array(items) => match items.as_slice() {
                [low, high] => match (as_number(low), as_number(high)) {
                    (Some(low), Some(high)) => Dimension::Range { low, high },
                    _ => return Err(unsupported("range bounds must be numbers")),
                },
                _ => return Err(unsupported("a range is a two-element array")),
            },
            toml::Value::Table(options) => {
                let mut choice = std::collections::BTreeMap::new();
                for (option, sub) in options {
                    let toml::Value::Table(sub) = sub else {
                        return Err(unsupported("choice options map to tables"));
                    };
                    choice.insert(option.clone(), parse_space(sub, &format!("{path}.{option}"))?);
                }
                Dimension::Choice(choice)
            }
            toml::Value::String(s) => Dimension::Fixed(ParamValue::Choice(s.clone())),
            other => match as_number(other) {
                Some(v) => Dimension::Fixed(ParamValue::Number(v)),
                None => return Err(unsupported("expected a range, a choice table or a scalar")),
            },
        };
        space.insert(name, dimension);
    }
    Ok(space)
}

fn as_number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Float(v) => Some(*v),
        toml::Value::Integer(v) => Some(*v as f64),
        _ => None,
    }
}
