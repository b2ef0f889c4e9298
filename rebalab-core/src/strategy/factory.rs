//! Converts a `StrategySpec` into a runtime `Strategy`.
//!
//! `create_strategy` builds the named strategy and applies its parameters;
//! `create_model` builds the bare signal model for injection into `tco` and
//! `factor` strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Strategy;
use crate::domain::ParamSet;
use crate::error::ConfigError;
use crate::models::{
    ConstantModel, HarmonicModel, MomentumModel, MovingAverageReversionModel, PriceRelativeModel,
    ReversedMomentumModel, ShortTermReversionModel, SignalModel,
};

/// Serializable description of a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    pub kind: String,
    #[serde(default)]
    pub params: ParamSet,
    /// Sub-models of a `factor` strategy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<StrategySpec>,
    /// Predictor of a `tco` strategy (defaults to `pamr`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictor: Option<Box<StrategySpec>>,
}

impl StrategySpec {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            params: ParamSet::new(),
            factors: Vec::new(),
            predictor: None,
        }
    }

    pub fn with_params(mut self, params: ParamSet) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Momentum,
    ReversedMomentum,
    Harmonic,
    Pamr,
    Olmar,
    Stmr,
    Tco,
    Factor,
    ConstantRebalance,
    BuyAndHold,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 10] = [
        StrategyKind::Momentum,
        StrategyKind::ReversedMomentum,
        StrategyKind::Harmonic,
        StrategyKind::Pamr,
        StrategyKind::Olmar,
        StrategyKind::Stmr,
        StrategyKind::Tco,
        StrategyKind::Factor,
        StrategyKind::ConstantRebalance,
        StrategyKind::BuyAndHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Momentum => "momentum",
            StrategyKind::ReversedMomentum => "reversed_momentum",
            StrategyKind::Harmonic => "harmonic",
            StrategyKind::Pamr => "pamr",
            StrategyKind::Olmar => "olmar",
            StrategyKind::Stmr => "stmr",
            StrategyKind::Tco => "tco",
            StrategyKind::Factor => "factor",
            StrategyKind::ConstantRebalance => "constant_rebalance",
            StrategyKind::BuyAndHold => "buy_and_hold",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

// ─── Model factory ───────────────────────────────────────────────────

/// Build a bare signal model. Parameters the model does not declare are ignored.
pub fn create_model(spec: &StrategySpec) -> Result<Box<dyn SignalModel>, ConfigError> {
    let mut model: Box<dyn SignalModel> = match spec.kind.parse::<StrategyKind>()? {
        StrategyKind::Momentum => Box::new(MomentumModel::default()),
        StrategyKind::ReversedMomentum => Box::new(ReversedMomentumModel::default()),
        StrategyKind::Harmonic => Box::new(HarmonicModel::default()),
        StrategyKind::Pamr => Box::new(PriceRelativeModel),
        StrategyKind::Olmar => Box::new(MovingAverageReversionModel::default()),
        StrategyKind::Stmr => Box::new(ShortTermReversionModel::default()),
        other => {
            return Err(ConfigError::InvalidValue {
                param: "kind".into(),
                reason: format!("'{other}' cannot be used as a sub-model"),
            })
        }
    };
    let own = spec.params.restricted_to(&model.param_spec());
    if !own.is_empty() {
        model.set_params(&own)?;
    }
    Ok(model)
}

// ─── Strategy factory ────────────────────────────────────────────────

pub fn create_strategy(spec: &StrategySpec) -> Result<Strategy, ConfigError> {
    let mut strategy = match spec.kind.parse::<StrategyKind>()? {
        StrategyKind::Momentum => Strategy::momentum(),
        StrategyKind::ReversedMomentum => Strategy::reversed_momentum(),
        StrategyKind::Harmonic => Strategy::harmonic(),
        StrategyKind::Pamr => Strategy::pamr(),
        StrategyKind::Olmar => Strategy::olmar(),
        StrategyKind::Stmr => Strategy::stmr(),
        StrategyKind::Tco => {
            let predictor = match &spec.predictor {
                Some(p) => create_model(p)?,
                None => Box::new(PriceRelativeModel),
            };
            Strategy::tco(predictor)
        }
        StrategyKind::Factor => {
            let factors = spec
                .factors
                .iter()
                .map(create_model)
                .collect::<Result<Vec<_>, _>>()?;
            Strategy::factor(factors)?
        }
        StrategyKind::ConstantRebalance => {
            let n = (0..)
                .take_while(|i| spec.params.contains(&ConstantModel::weight_param(*i)))
                .count();
            Strategy::constant_rebalance(n)
        }
        StrategyKind::BuyAndHold => Strategy::buy_and_hold(),
    };

    if !spec.params.is_empty() {
        strategy.set_params(&spec.params)?;
    }
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_config_error() {
        assert_eq!(
            create_strategy(&StrategySpec::new("martingale")).unwrap_err(),
            ConfigError::UnknownStrategy("martingale".into())
        );
    }

    #[test]
    fn default_strategies_build_without_params() {
        for kind in StrategyKind::ALL {
            let mut spec = StrategySpec::new(kind.as_str());
            if kind == StrategyKind::Factor {
                spec.factors = vec![StrategySpec::new("pamr")];
            }
            let s = create_strategy(&spec).unwrap();
            assert_eq!(s.name(), kind.as_str());
        }
    }

    #[test]
    fn pamr_params_applied() {
        let spec = StrategySpec::new("pamr").with_params(
            ParamSet::new()
                .with("sensitivity", 0.05)
                .with("variant", "PAMR2")
                .with("C", 10.0),
        );
        let s = create_strategy(&spec).unwrap();
        assert!(s.param_spec().accepts("C"));
    }

    #[test]
    fn constant_rebalance_counts_weight_params() {
        let spec = StrategySpec::new("constant_rebalance").with_params(
            ParamSet::new()
                .with("w0", 1.0)
                .with("w1", 1.0)
                .with("w2", 0.0),
        );
        let s = create_strategy(&spec).unwrap();
        assert_eq!(s.param_spec().required.len(), 3);
    }

    #[test]
    fn factor_requires_sub_models() {
        assert!(create_strategy(&StrategySpec::new("factor")).is_err());
    }

    #[test]
    fn factor_sub_model_cannot_be_composite() {
        let mut spec = StrategySpec::new("factor");
        spec.factors = vec![StrategySpec::new("tco")];
        assert!(matches!(
            create_strategy(&spec),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn spec_deserializes_from_json() {
        let spec: StrategySpec = serde_json::from_str(
            r#"{"kind":"tco","params":{"toff":0.1,"window":5},"predictor":{"kind":"olmar"}}"#,
        )
        .unwrap();
        let s = create_strategy(&spec).unwrap();
        assert_eq!(s.model().name(), "olmar");
    }
}
