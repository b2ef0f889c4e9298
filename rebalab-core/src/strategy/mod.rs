//! Strategy composition: one signal model plus one update rule.
//!
//! A strategy reads the current weights from the window, asks the model for a
//! signal, lets the rule condition it on the window, and updates. Parameters
//! are routed to whichever component declares them.

pub mod factory;

pub use factory::{create_model, create_strategy, StrategyKind, StrategySpec};

use crate::domain::{Allocation, DiagnosticLog, ObservationWindow, ParamSet, ParamSpec, SignalVector};
use crate::error::{ConfigError, StrategyError};
use crate::models::{
    ConstantModel, FactorModel, FlatModel, HarmonicModel, MomentumModel,
    MovingAverageReversionModel, PriceRelativeModel, ReversedMomentumModel, ShortTermReversionModel,
    SignalModel,
};
use crate::portfolio::portfolio_vector;
use crate::rules::{
    AsymmetricStep, DriftUpdate, HoldUpdate, MomentumUpdate, OlmarUpdate, PamrUpdate,
    StepDirection, StmrUpdate, TcoUpdate, UpdateRule, VolatilityScaledStep,
};

#[derive(Debug, Clone)]
pub struct Strategy {
    name: String,
    model: Box<dyn SignalModel>,
    rule: Box<dyn UpdateRule>,
    /// Which row the previous weights are read from (0 = last row).
    holdings_back: usize,
}

impl Strategy {
    pub fn new(
        name: impl Into<String>,
        model: Box<dyn SignalModel>,
        rule: Box<dyn UpdateRule>,
        holdings_back: usize,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            rule,
            holdings_back,
        }
    }

    // ─── Named strategies ────────────────────────────────────────────

    pub fn momentum() -> Self {
        Self::new(
            "momentum",
            Box::new(MomentumModel::default()),
            Box::new(MomentumUpdate::default()),
            1,
        )
    }

    pub fn reversed_momentum() -> Self {
        Self::new(
            "reversed_momentum",
            Box::new(ReversedMomentumModel::default()),
            Box::new(AsymmetricStep::plain(StepDirection::Against)),
            0,
        )
    }

    pub fn harmonic() -> Self {
        Self::new(
            "harmonic",
            Box::new(HarmonicModel::default()),
            Box::new(AsymmetricStep::smoothed(0.99, StepDirection::Follow)),
            0,
        )
    }

    pub fn pamr() -> Self {
        Self::new(
            "pamr",
            Box::new(PriceRelativeModel),
            Box::new(PamrUpdate::default()),
            1,
        )
    }

    pub fn olmar() -> Self {
        Self::new(
            "olmar",
            Box::new(MovingAverageReversionModel::default()),
            Box::new(OlmarUpdate::default()),
            1,
        )
    }

    pub fn stmr() -> Self {
        Self::new(
            "stmr",
            Box::new(ShortTermReversionModel::default()),
            Box::new(StmrUpdate::default()),
            1,
        )
    }

    /// Transaction-cost-aware update driven by an injected predictor.
    pub fn tco(predictor: Box<dyn SignalModel>) -> Self {
        Self::new("tco", predictor, Box::new(TcoUpdate::default()), 0)
    }

    /// Volatility-scaled weighted combination of sub-models.
    pub fn factor(factors: Vec<Box<dyn SignalModel>>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            "factor",
            Box::new(FactorModel::new(factors)?),
            Box::new(VolatilityScaledStep::default()),
            0,
        ))
    }

    /// Fixed target; `n_symbols = 0` means uniform over the assets.
    pub fn constant_rebalance(n_symbols: usize) -> Self {
        let model = if n_symbols == 0 {
            ConstantModel::uniform()
        } else {
            ConstantModel::with_symbols(n_symbols)
        };
        Self::new("constant_rebalance", Box::new(model), Box::new(HoldUpdate), 0)
    }

    pub fn buy_and_hold() -> Self {
        Self::new("buy_and_hold", Box::new(FlatModel), Box::new(DriftUpdate), 0)
    }

    // ─── Accessors ───────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &dyn SignalModel {
        self.model.as_ref()
    }

    pub fn rule(&self) -> &dyn UpdateRule {
        self.rule.as_ref()
    }

    pub fn holdings_back(&self) -> usize {
        self.holdings_back
    }

    /// Rows a window must have for `rebalance` to succeed.
    pub fn warmup_rows(&self) -> usize {
        self.model.warmup_rows().max(self.holdings_back + 1)
    }

    // ─── Operations ──────────────────────────────────────────────────

    pub fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        self.model.predict(window)
    }

    /// One update step from the weights currently held in `window`.
    pub fn rebalance(
        &self,
        window: &ObservationWindow,
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let prev = portfolio_vector(window, self.holdings_back)?;
        let signal = self.model.predict(window)?;
        self.model.annotate(window, &signal, log);
        let signal = self.rule.condition(window, signal)?;
        self.rule.update(&prev, &signal, log)
    }

    pub fn param_spec(&self) -> ParamSpec {
        self.model.param_spec().join(self.rule.param_spec())
    }

    /// Route each name to the component declaring it.
    ///
    /// Names neither component accepts are rejected before anything changes.
    pub fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;

        let model_spec = self.model.param_spec();
        let rule_spec = self.rule.param_spec();
        let mut model = self.model.clone();
        let mut rule = self.rule.clone();
        model.set_params(&params.restricted_to(&model_spec))?;
        rule.set_params(&params.restricted_to(&rule_spec))?;

        self.model = model;
        self.rule = rule;
        Ok(())
    }
}
