//! Search spaces, constraints and black-box maximizers.
//!
//! A `SearchSpace` maps parameter names to bounded ranges, categorical
//! choices with nested sub-spaces, or fixed values. Solvers only see the
//! flattened continuous box: every range is one coordinate, every choice is
//! one coordinate in `[0, k)` followed by the coordinates of all of its
//! options' sub-spaces. `decode` maps a point back to a `ParamSet`,
//! keeping only the parameters of the selected options.
//!
//! Cancellation is cooperative: solvers poll a `CancellationToken` before
//! each evaluation, and an objective returning `None` marks an evaluation
//! aborted mid-flight. Either way the solver stops and reports what it has.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rebalab_core::{ParamSet, ParamValue};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchSpaceError {
    #[error("invalid range for '{name}': [{low}, {high}]")]
    InvalidRange { name: String, low: f64, high: f64 },

    #[error("choice '{0}' has no options")]
    EmptyChoice(String),

    #[error("unsupported value for '{name}': {reason}")]
    Unsupported { name: String, reason: String },

    #[error("cannot parse constraint '{0}' (expected `a < b`, `a <= b`, `a > b` or `a >= b`)")]
    BadConstraint(String),
}

// ─── Cancellation ────────────────────────────────────────────────────

/// Shared cooperative-cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ─── SearchSpace ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Dimension {
    Range { low: f64, high: f64 },
    /// Option name → sub-space explored when that option is selected.
    Choice(BTreeMap<String, SearchSpace>),
    Fixed(ParamValue),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSpace(BTreeMap<String, Dimension>);

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, name: &str, low: f64, high: f64) -> Self {
        self.0.insert(name.to_string(), Dimension::Range { low, high });
        self
    }

    pub fn with_choice(mut self, name: &str, options: BTreeMap<String, SearchSpace>) -> Self {
        self.0.insert(name.to_string(), Dimension::Choice(options));
        self
    }

    pub fn with_fixed(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.to_string(), Dimension::Fixed(value.into()));
        self
    }

    pub fn insert(&mut self, name: &str, dimension: Dimension) {
        self.0.insert(name.to_string(), dimension);
    }

    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of two spaces; `other` wins on name clashes.
    pub fn merged(mut self, other: SearchSpace) -> SearchSpace {
        self.0.extend(other.0);
        self
    }

    pub fn validate(&self) -> Result<(), SearchSpaceError> {
        for (name, dim) in &self.0 {
            match dim {
                Dimension::Range { low, high } => {
                    if !low.is_finite() || !high.is_finite() || low > high {
                        return Err(SearchSpaceError::InvalidRange {
                            name: name.clone(),
                            low: *low,
                            high: *high,
                        });
                    }
                }
                Dimension::Choice(options) => {
                    if options.is_empty() {
                        return Err(SearchSpaceError::EmptyChoice(name.clone()));
                    }
                    for sub in options.values() {
                        sub.validate()?;
                    }
                }
                Dimension::Fixed(_) => {}
            }
        }
        Ok(())
    }

    /// Bounds of the flattened continuous box.
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        self.collect_bounds(&mut out);
        out
    }

    fn collect_bounds(&self, out: &mut Vec<(f64, f64)>) {
        for dim in self.0.values() {
            match dim {
                Dimension::Range { low, high } => out.push((*low, *high)),
                Dimension::Choice(options) => {
                    out.push((0.0, options.len() as f64));
                    for sub in options.values() {
                        sub.collect_bounds(out);
                    }
                }
                Dimension::Fixed(_) => {}
            }
        }
    }

    /// Map a point of the flattened box back to parameters.
    ///
    /// Missing coordinates decode as the lower bound.
    pub fn decode(&self, point: &[f64]) -> ParamSet {
        let mut out = ParamSet::new();
        let mut pos = 0;
        self.decode_into(point, &mut pos, &mut out, true);
        out
    }

    fn decode_into(&self, point: &[f64], pos: &mut usize, out: &mut ParamSet, active: bool) {
        for (name, dim) in &self.0 {
            match dim {
                Dimension::Range { low, high } => {
                    let v = point.get(*pos).copied().unwrap_or(*low).clamp(*low, *high);
                    *pos += 1;
                    if active {
                        out.insert(name, v);
                    }
                }
                Dimension::Choice(options) => {
                    let k = options.len();
                    let raw = point.get(*pos).copied().unwrap_or(0.0);
                    *pos += 1;
                    let selected = if raw.is_finite() {
                        (raw.floor().max(0.0) as usize).min(k.saturating_sub(1))
                    } else {
                        0
                    };
                    for (i, (option, sub)) in options.iter().enumerate() {
                        let chosen = active && i == selected;
                        if chosen {
                            out.insert(name, option.as_str());
                        }
                        sub.decode_into(point, pos, out, chosen);
                    }
                }
                Dimension::Fixed(value) => {
                    if active {
                        out.insert(name, value.clone());
                    }
                }
            }
        }
    }
}

// ─── Constraints ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl Comparison {
    fn as_str(&self) -> &'static str {
        match self {
            Comparison::Less => "<",
            Comparison::LessEq => "<=",
            Comparison::Greater => ">",
            Comparison::GreaterEq => ">=",
        }
    }

    fn holds(&self, a: f64, b: f64) -> bool {
        match self {
            Comparison::Less => a < b,
            Comparison::LessEq => a <= b,
            Comparison::Greater => a > b,
            Comparison::GreaterEq => a >= b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Param(String),
    Literal(f64),
}

impl Operand {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        match s.parse::<f64>() {
            Ok(v) => Some(Operand::Literal(v)),
            Err(_) if s.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                Some(Operand::Param(s.to_string()))
            }
            Err(_) => None,
        }
    }

    fn resolve(&self, params: &ParamSet) -> Option<f64> {
        match self {
            Operand::Literal(v) => Some(*v),
            Operand::Param(name) => match params.get(name) {
                Some(ParamValue::Number(v)) => Some(*v),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Param(name) => f.write_str(name),
            Operand::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// Boolean predicate over a candidate, e.g. `ma1 < ma2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub left: Operand,
    pub op: Comparison,
    pub right: Operand,
}

impl Constraint {
    /// Candidates lacking a referenced numeric parameter pass.
    pub fn is_satisfied(&self, params: &ParamSet) -> bool {
        match (self.left.resolve(params), self.right.resolve(params)) {
            (Some(a), Some(b)) => self.op.holds(a, b),
            _ => true,
        }
    }
}

impl FromStr for Constraint {
    type Err = SearchSpaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SearchSpaceError::BadConstraint(s.to_string());
        // two-character operators first
        let ops = [
            ("<=", Comparison::LessEq),
            (">=", Comparison::GreaterEq),
            ("<", Comparison::Less),
            (">", Comparison::Greater),
        ];
        let (idx, token, op) = ops
            .iter()
            .find_map(|(token, op)| s.find(token).map(|idx| (idx, *token, *op)))
            .ok_or_else(bad)?;
        let left = Operand::parse(&s[..idx]).ok_or_else(bad)?;
        let right = Operand::parse(&s[idx + token.len()..]).ok_or_else(bad)?;
        Ok(Self { left, op, right })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.as_str(), self.right)
    }
}

// ─── Progress & results ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub evaluation: usize,
    pub value: f64,
    pub params: ParamSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Running state of one search, owned by the caller and threaded through
/// the objective by `&mut`.
#[derive(Debug, Clone)]
pub struct SearchProgress {
    pub evaluations: usize,
    pub budget: usize,
    pub started: Instant,
    pub best_value: Option<f64>,
    pub best_params: Option<ParamSet>,
    pub trace: Vec<TraceEntry>,
}

impl SearchProgress {
    pub fn new(budget: usize) -> Self {
        Self {
            evaluations: 0,
            budget,
            started: Instant::now(),
            best_value: None,
            best_params: None,
            trace: Vec::new(),
        }
    }

    /// Record one finished evaluation. Returns true when it is a new best.
    pub fn record(&mut self, params: ParamSet, value: f64, note: Option<String>) -> bool {
        self.evaluations += 1;
        let improved = !value.is_nan() && self.best_value.map_or(true, |best| value > best);
        if improved {
            self.best_value = Some(value);
            self.best_params = Some(params.clone());
        }
        self.trace.push(TraceEntry {
            evaluation: self.evaluations,
            value,
            params,
            note,
        });
        improved
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Seconds left at the current evaluation rate.
    pub fn eta_secs(&self) -> Option<f64> {
        if self.evaluations == 0 {
            return None;
        }
        let per_eval = self.elapsed_secs() / self.evaluations as f64;
        Some(per_eval * self.budget.saturating_sub(self.evaluations) as f64)
    }

    pub fn into_result(self, interrupted: bool) -> OptimizationResult {
        OptimizationResult {
            elapsed_secs: self.elapsed_secs(),
            best_params: self.best_params.unwrap_or_default(),
            best_value: self.best_value,
            evaluations: self.evaluations,
            interrupted,
            trace: self.trace,
        }
    }
}

/// Best parameters found plus the search trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_params: ParamSet,
    pub best_value: Option<f64>,
    pub evaluations: usize,
    pub elapsed_secs: f64,
    pub interrupted: bool,
    pub trace: Vec<TraceEntry>,
}

// ─── Solvers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub best_point: Option<Vec<f64>>,
    pub best_value: Option<f64>,
    pub evaluations: usize,
    pub interrupted: bool,
}

pub trait Maximizer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Maximize `objective` over the box within `budget` evaluations.
    fn maximize(
        &self,
        bounds: &[(f64, f64)],
        budget: usize,
        rng: &mut StdRng,
        cancel: &CancellationToken,
        objective: &mut dyn FnMut(&[f64]) -> Option<f64>,
    ) -> SolverOutcome;
}

/// Budget, cancellation and best-so-far bookkeeping shared by the solvers.
struct Tracker<'a> {
    objective: &'a mut dyn FnMut(&[f64]) -> Option<f64>,
    cancel: &'a CancellationToken,
    budget: usize,
    evaluations: usize,
    best_point: Option<Vec<f64>>,
    best_value: Option<f64>,
    interrupted: bool,
}

impl<'a> Tracker<'a> {
    fn new(
        objective: &'a mut dyn FnMut(&[f64]) -> Option<f64>,
        cancel: &'a CancellationToken,
        budget: usize,
    ) -> Self {
        Self {
            objective,
            cancel,
            budget,
            evaluations: 0,
            best_point: None,
            best_value: None,
            interrupted: false,
        }
    }

    fn exhausted(&self) -> bool {
        self.interrupted || self.evaluations >= self.budget
    }

    fn eval(&mut self, point: &[f64]) -> Option<f64> {
        if self.exhausted() {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.interrupted = true;
            return None;
        }
        let Some(value) = (self.objective)(point) else {
            self.interrupted = true;
            return None;
        };
        self.evaluations += 1;
        if !value.is_nan() && self.best_value.map_or(true, |best| value > best) {
            self.best_value = Some(value);
            self.best_point = Some(point.to_vec());
        }
        Some(value)
    }

    fn finish(self) -> SolverOutcome {
        SolverOutcome {
            best_point: self.best_point,
            best_value: self.best_value,
            evaluations: self.evaluations,
            interrupted: self.interrupted,
        }
    }
}

fn sample_point(bounds: &[(f64, f64)], rng: &mut StdRng) -> Vec<f64> {
    bounds
        .iter()
        .map(|(lo, hi)| lo + (hi - lo) * rng.gen::<f64>())
        .collect()
}

/// Uniform sampling of the box.
#[derive(Debug, Clone, Default)]
pub struct RandomSearch;

impl Maximizer for RandomSearch {
    fn name(&self) -> &str {
        "random_search"
    }

    fn maximize(
        &self,
        bounds: &[(f64, f64)],
        budget: usize,
        rng: &mut StdRng,
        cancel: &CancellationToken,
        objective: &mut dyn FnMut(&[f64]) -> Option<f64>,
    ) -> SolverOutcome {
        let mut tracker = Tracker::new(objective, cancel, budget);
        if bounds.is_empty() {
            tracker.eval(&[]);
            return tracker.finish();
        }
        while !tracker.exhausted() {
            let point = sample_point(bounds, rng);
            tracker.eval(&point);
        }
        tracker.finish()
    }
}

/// Global-best particle swarm with inertia weight, positions clamped to the box.
#[derive(Debug, Clone)]
pub struct ParticleSwarm {
    pub swarm_size: usize,
    pub inertia: f64,
    pub cognitive: f64,
    pub social: f64,
}

impl Default for ParticleSwarm {
    fn default() -> Self {
        Self {
            swarm_size: 10,
            inertia: 0.729,
            cognitive: 1.494,
            social: 1.494,
        }
    }
}

impl Maximizer for ParticleSwarm {
    fn name(&self) -> &str {
        "particle_swarm"
    }

    fn maximize(
        &self,
        bounds: &[(f64, f64)],
        budget: usize,
        rng: &mut StdRng,
        cancel: &CancellationToken,
        objective: &mut dyn FnMut(&[f64]) -> Option<f64>,
    ) -> SolverOutcome {
        let mut tracker = Tracker::new(objective, cancel, budget);
        if bounds.is_empty() {
            tracker.eval(&[]);
            return tracker.finish();
        }

        let n = self.swarm_size.max(1);
        let mut positions: Vec<Vec<f64>> = (0..n).map(|_| sample_point(bounds, rng)).collect();
        let mut velocities: Vec<Vec<f64>> = (0..n)
            .map(|_| {
                bounds
                    .iter()
                    .map(|(lo, hi)| (hi - lo) * (2.0 * rng.gen::<f64>() - 1.0))
                    .collect()
            })
            .collect();
        let mut personal_best = positions.clone();
        let mut personal_value = vec![f64::NEG_INFINITY; n];
        let mut global_best = positions[0].clone();
        let mut global_value = f64::NEG_INFINITY;

        for (i, position) in positions.iter().enumerate() {
            let Some(value) = tracker.eval(position) else {
                return tracker.finish();
            };
            personal_value[i] = value;
            if value > global_value {
                global_value = value;
                global_best = position.clone();
            }
        }

        while !tracker.exhausted() {
            for i in 0..n {
                for (d, (lo, hi)) in bounds.iter().enumerate() {
                    let r1: f64 = rng.gen();
                    let r2: f64 = rng.gen();
                    let x = positions[i][d];
                    let v = self.inertia * velocities[i][d]
                        + self.cognitive * r1 * (personal_best[i][d] - x)
                        + self.social * r2 * (global_best[d] - x);
                    velocities[i][d] = v;
                    positions[i][d] = (x + v).clamp(*lo, *hi);
                }
                let Some(value) = tracker.eval(&positions[i]) else {
                    return tracker.finish();
                };
                if value > personal_value[i] {
                    personal_value[i] = value;
                    personal_best[i] = positions[i].clone();
                }
                if value > global_value {
                    global_value = value;
                    global_best = positions[i].clone();
                }
            }
        }
        tracker.finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    #[default]
    ParticleSwarm,
    RandomSearch,
}

impl SolverKind {
    pub fn build(&self) -> Box<dyn Maximizer> {
        match self {
            SolverKind::ParticleSwarm => Box::new(ParticleSwarm::default()),
            SolverKind::RandomSearch => Box::new(RandomSearch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pamr_space() -> SearchSpace {
        let mut variants = BTreeMap::new();
        variants.insert("PAMR0".to_string(), SearchSpace::new());
        variants.insert("PAMR1".to_string(), SearchSpace::new().with_range("C", 1.0, 5000.0));
        variants.insert("PAMR2".to_string(), SearchSpace::new().with_range("C", 1.0, 5000.0));
        SearchSpace::new()
            .with_range("sensitivity", 0.0, 0.1)
            .with_choice("variant", variants)
    }

    #[test]
    fn bounds_flatten_choices_and_sub_spaces() {
        // sensitivity, variant, C (PAMR1), C (PAMR2)
        assert_eq!(
            pamr_space().bounds(),
            vec![(0.0, 0.1), (0.0, 3.0), (1.0, 5000.0), (1.0, 5000.0)]
        );
    }

    #[test]
    fn decode_keeps_only_selected_option_params() {
        let space = pamr_space();
        let p = space.decode(&[0.05, 2.5, 10.0, 20.0]);
        assert_eq!(p.choice("variant").unwrap(), "PAMR2");
        assert_eq!(p.number("C").unwrap(), 20.0);
        assert_eq!(p.number("sensitivity").unwrap(), 0.05);

        let p = space.decode(&[0.05, 0.2, 10.0, 20.0]);
        assert_eq!(p.choice("variant").unwrap(), "PAMR0");
        assert!(!p.contains("C"));
    }

    #[test]
    fn decode_clamps_out_of_box_points() {
        let space = pamr_space();
        let p = space.decode(&[5.0, 3.0, 0.0, 0.0]);
        assert_eq!(p.number("sensitivity").unwrap(), 0.1);
        assert_eq!(p.choice("variant").unwrap(), "PAMR2");
        assert_eq!(p.number("C").unwrap(), 1.0);
    }

    #[test]
    fn fixed_values_always_decoded() {
        let space = SearchSpace::new()
            .with_fixed("variant", "PAMR1")
            .with_range("sensitivity", 0.0, 0.1);
        assert_eq!(space.bounds().len(), 1);
        assert_eq!(space.decode(&[0.0]).choice("variant").unwrap(), "PAMR1");
    }

    #[test]
    fn invalid_ranges_rejected() {
        assert!(SearchSpace::new().with_range("a", 1.0, 0.0).validate().is_err());
        assert!(SearchSpace::new()
            .with_choice("v", BTreeMap::new())
            .validate()
            .is_err());
        assert!(pamr_space().validate().is_ok());
    }

    #[test]
    fn constraint_parsing_and_checking() {
        let c: Constraint = "ma1 < ma2".parse().unwrap();
        assert_eq!(c.to_string(), "ma1 < ma2");
        let ok = ParamSet::new().with("ma1", 3.0).with("ma2", 5.0);
        let bad = ParamSet::new().with("ma1", 5.0).with("ma2", 5.0);
        assert!(c.is_satisfied(&ok));
        assert!(!c.is_satisfied(&bad));

        let c: Constraint = "ma2 >= 5".parse().unwrap();
        assert!(c.is_satisfied(&bad));
        assert!(c.is_satisfied(&ParamSet::new()));

        assert!("ma1 = ma2".parse::<Constraint>().is_err());
        assert!("< ma2".parse::<Constraint>().is_err());
    }

    #[test]
    fn cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn progress_tracks_best_and_trace() {
        let mut progress = SearchProgress::new(10);
        assert!(progress.record(ParamSet::new().with("a", 1.0), 0.5, None));
        assert!(!progress.record(ParamSet::new().with("a", 2.0), 0.1, None));
        assert!(!progress.record(ParamSet::new().with("a", 3.0), f64::NAN, None));
        assert_eq!(progress.best_value, Some(0.5));
        let result = progress.into_result(false);
        assert_eq!(result.best_params.number("a").unwrap(), 1.0);
        assert_eq!(result.trace.len(), 3);
        assert_eq!(result.evaluations, 3);
    }

    fn parabola(x: &[f64]) -> Option<f64> {
        Some(-(x[0] - 0.3).powi(2) - (x[1] + 0.2).powi(2))
    }

    #[test]
    fn solvers_respect_budget_and_find_optimum() {
        let bounds = [(-1.0, 1.0), (-1.0, 1.0)];
        let solvers: Vec<Box<dyn Maximizer>> =
            vec![Box::new(ParticleSwarm::default()), Box::new(RandomSearch)];
        for solver in solvers {
            let mut rng = StdRng::seed_from_u64(1);
            let mut calls = 0;
            let mut objective = |x: &[f64]| {
                calls += 1;
                parabola(x)
            };
            let out = solver.maximize(
                &bounds,
                300,
                &mut rng,
                &CancellationToken::new(),
                &mut objective,
            );
            assert_eq!(calls, 300, "{}", solver.name());
            assert_eq!(out.evaluations, 300);
            assert!(!out.interrupted);
            let best = out.best_point.unwrap();
            assert!((best[0] - 0.3).abs() < 0.1, "{}: {best:?}", solver.name());
            assert!((best[1] + 0.2).abs() < 0.1, "{}: {best:?}", solver.name());
        }
    }

    #[test]
    fn solvers_are_deterministic() {
        let bounds = [(-1.0, 1.0), (-1.0, 1.0)];
        let run = || {
            let mut rng = StdRng::seed_from_u64(9);
            ParticleSwarm::default().maximize(
                &bounds,
                50,
                &mut rng,
                &CancellationToken::new(),
                &mut parabola,
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn cancellation_stops_search_with_best_so_far() {
        let token = CancellationToken::new();
        let mut calls = 0;
        let mut objective = |x: &[f64]| {
            calls += 1;
            if calls == 5 {
                token.cancel();
            }
            parabola(x)
        };
        let mut rng = StdRng::seed_from_u64(2);
        let out = ParticleSwarm::default().maximize(
            &[(-1.0, 1.0), (-1.0, 1.0)],
            100,
            &mut rng,
            &token,
            &mut objective,
        );
        assert!(out.interrupted);
        assert_eq!(out.evaluations, 5);
        assert!(out.best_point.is_some());
    }

    #[test]
    fn aborted_evaluation_is_not_counted() {
        let mut calls = 0;
        let mut objective = |x: &[f64]| {
            calls += 1;
            if calls == 3 {
                None
            } else {
                parabola(x)
            }
        };
        let mut rng = StdRng::seed_from_u64(2);
        let out = RandomSearch.maximize(
            &[(-1.0, 1.0), (-1.0, 1.0)],
            100,
            &mut rng,
            &CancellationToken::new(),
            &mut objective,
        );
        assert!(out.interrupted);
        assert_eq!(out.evaluations, 2);
    }

    #[test]
    fn empty_box_evaluates_once() {
        let mut calls = 0;
        let mut objective = |_: &[f64]| {
            calls += 1;
            Some(1.0)
        };
        let mut rng = StdRng::seed_from_u64(0);
        let out = ParticleSwarm::default().maximize(
            &[],
            50,
            &mut rng,
            &CancellationToken::new(),
            &mut objective,
        );
        assert_eq!(calls, 1);
        assert_eq!(out.best_point, Some(vec![]));
    }
}
