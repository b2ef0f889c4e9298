//! Domain types shared by models, rules and the agent.

pub mod allocation;
pub mod bar;
pub mod diagnostics;
pub mod params;
pub mod window;

pub use allocation::{Allocation, SignalVector, EPSILON, SIMPLEX_TOLERANCE};
pub use bar::Bar;
pub use diagnostics::{DiagnosticLog, DiagnosticValue};
pub use params::{ParamSet, ParamSpec, ParamValue};
pub use window::{AssetSeries, FiatSeries, ObservationWindow};

/// Symbol type alias
pub type Symbol = String;
