//! Trial metrics through the `metrics` facade
//!
//! Nothing here installs a recorder; without one every call is a no-op.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Parameters for one trial attempt metric
pub struct TrialMetricParams<'a> {
    pub service: &'a str,
    pub method: &'a str,
    pub trial_key: &'a str,
    pub duration: Duration,
    pub success: bool,
}

/// Record one trial attempt
pub fn record_trial_invocation(params: TrialMetricParams<'_>) {
    let labels = [
        ("service", params.service.to_string()),
        ("method", params.method.to_string()),
        ("trial_key", params.trial_key.to_string()),
        ("status", status_label(params.success).to_string()),
    ];

    counter!("trial_invocations_total", &labels).increment(1);
    histogram!("trial_invocation_duration_seconds", &labels).record(params.duration.as_secs_f64());

    if !params.success {
        counter!("trial_failures_total", &labels).increment(1);
    }
}

/// Record a circuit breaker state change
pub fn record_circuit_state(service: &str, trial_key: &str, open: bool) {
    let labels = [
        ("service", service.to_string()),
        ("trial_key", trial_key.to_string()),
    ];

    gauge!("trial_circuit_open", &labels).set(if open { 1.0 } else { 0.0 });
}

/// Count an event a sink had to drop
pub fn record_dropped_event(sink: &'static str, kind: &'static str) {
    counter!("trial_events_dropped_total", "sink" => sink, "kind" => kind).increment(1);
}

fn status_label(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(true), "success");
        assert_eq!(status_label(false), "error");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_trial_invocation(TrialMetricParams {
            service: "PaymentService",
            method: "charge",
            trial_key: "stripe",
            duration: Duration::from_millis(5),
            success: false,
        });
        record_circuit_state("PaymentService", "stripe", true);
        record_dropped_event("channel", "outcome");
    }
}
