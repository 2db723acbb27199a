//! Observability - trial metrics

mod metrics;

pub use metrics::{
    record_circuit_state, record_dropped_event, record_trial_invocation, TrialMetricParams,
};
