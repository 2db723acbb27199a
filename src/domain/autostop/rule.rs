//! Stopping rule contract

use super::{ExperimentData, StoppingDecision};

/// Decides from aggregated data whether an experiment can stop.
///
/// Rules hold configuration only; evaluating never mutates the data.
pub trait StoppingRule: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, data: &ExperimentData) -> StoppingDecision;
}
