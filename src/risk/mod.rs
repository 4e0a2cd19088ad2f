//! Healthcare risk assessment engine.
//!
//! Computes probability of default (PD), loss given default (LGD) and
//! expected loss for a procedure-financing application, decides
//! approve/review/decline, and derives risk-adjusted pricing and terms.
//! Scores are built from pluggable healthcare data sources; a source outage
//! degrades to neutral defaults rather than failing the assessment.

pub mod affordability;
pub mod model;
pub mod service;
pub mod sources;

pub use affordability::{AffordabilityCalculator, AffordabilityInput, AffordabilityOutcome};
pub use model::*;
pub use service::RiskEngine;
pub use sources::{BureauSource, RiskDataSources, SimulatedBureau};
