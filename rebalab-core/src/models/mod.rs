//! Signal models: per-asset directional estimates from an observation window.
//!
//! A model returns one value per non-fiat asset, in window symbol order.
//! The update rule that consumes the signal decides how to treat the fiat
//! slot. Models never see the previous allocation.

pub mod constant;
pub mod factor;
pub mod harmonic;
pub mod momentum;
pub mod reversion;

pub use constant::{ConstantModel, FlatModel};
pub use factor::FactorModel;
pub use harmonic::{HarmonicModel, HarmonicPattern, PATTERNS};
pub use momentum::{MomentumModel, MovingAverageSpread, ReversedMomentumModel};
pub use reversion::{MovingAverageReversionModel, PriceRelativeModel, ShortTermReversionModel};

use std::fmt::Debug;

use crate::domain::{DiagnosticLog, ObservationWindow, ParamSet, ParamSpec, SignalVector};
use crate::error::{ConfigError, StrategyError};

pub trait SignalModel: Send + Sync + Debug {
    /// Stable identifier, also the prefix of factor weight parameters.
    fn name(&self) -> &str;

    /// Minimum window rows `predict` needs.
    fn warmup_rows(&self) -> usize;

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError>;

    /// Write model-specific diagnostics for the signal just produced.
    fn annotate(&self, _window: &ObservationWindow, _signal: &[f64], _log: &mut DiagnosticLog) {}

    fn param_spec(&self) -> ParamSpec;

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError>;

    fn clone_box(&self) -> Box<dyn SignalModel>;
}

impl Clone for Box<dyn SignalModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
