//! Auto-stop analysis
//!
//! Stopping rules read an [`ExperimentData`] snapshot and return a
//! [`StoppingDecision`]. They are off the invocation path; combining several
//! rules is up to the caller.

mod entity;
mod rule;

pub use entity::{ExperimentData, StoppingDecision, VariantData};
pub use rule::StoppingRule;
