//! Aggregates outcome events into experiment data for stopping rules

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::domain::{EventSink, ExperimentData, OutcomeEvent, TrialError, TrialEvent};

/// Event sink that keeps running per-variant counters.
///
/// Outcomes are grouped by experiment name, or by service type when the
/// registration has no name. Each outcome counts once for its trial key, with
/// its duration in milliseconds as the metric value.
#[derive(Debug, Default)]
pub struct ExperimentDataCollector {
    experiments: Mutex<IndexMap<String, ExperimentData>>,
    controls: HashMap<String, String>,
}

impl ExperimentDataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `trial_key` as the control variant of `experiment`
    pub fn with_control(mut self, experiment: impl Into<String>, trial_key: impl Into<String>) -> Self {
        self.controls.insert(experiment.into(), trial_key.into());
        self
    }

    pub fn snapshot(&self, experiment: &str) -> Option<ExperimentData> {
        self.experiments.lock().get(experiment).cloned()
    }

    /// Every experiment seen so far, in first-seen order
    pub fn snapshots(&self) -> Vec<ExperimentData> {
        self.experiments.lock().values().cloned().collect()
    }

    pub fn reset(&self, experiment: &str) -> Option<ExperimentData> {
        self.experiments.lock().shift_remove(experiment)
    }

    fn record(&self, outcome: &OutcomeEvent) {
        let name = outcome.experiment_key();
        let mut experiments = self.experiments.lock();

        let data = experiments
            .entry(name.to_string())
            .or_insert_with(|| ExperimentData::new(name, outcome.timestamp));

        let variant = data.variant_mut(&outcome.trial_key);
        if self.controls.get(name) == Some(&outcome.trial_key) {
            variant.is_control = true;
        }

        variant.record_value(outcome.success, outcome.duration_ms as f64);
    }
}

impl EventSink for ExperimentDataCollector {
    fn publish(&self, event: TrialEvent) -> Result<(), TrialError> {
        if let TrialEvent::Outcome(outcome) = &event {
            self.record(outcome);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::{ExposureEvent, InvocationContext, ServiceType};

    fn outcome(experiment: Option<&str>, trial_key: &str, success: bool, duration_ms: u64) -> TrialEvent {
        let context = InvocationContext::new(ServiceType::new("PaymentService"), "charge", trial_key)
            .with_experiment_name(experiment.map(str::to_string));
        let mut event = OutcomeEvent::from_context(&context, duration_ms);
        event.success = success;
        event.invocation_id = Uuid::new_v4();
        TrialEvent::Outcome(event)
    }

    #[test]
    fn test_aggregates_per_variant() {
        let collector = ExperimentDataCollector::new().with_control("psp", "stripe");

        collector.publish(outcome(Some("psp"), "adyen", true, 10)).unwrap();
        collector.publish(outcome(Some("psp"), "stripe", false, 30)).unwrap();
        collector.publish(outcome(Some("psp"), "adyen", false, 20)).unwrap();

        let data = collector.snapshot("psp").unwrap();
        let adyen = data.variant("adyen").unwrap();

        assert_eq!(adyen.sample_size, 2);
        assert_eq!(adyen.successes, 1);
        assert!((adyen.mean() - 15.0).abs() < 1e-9);
        assert_eq!(data.control().unwrap().key, "stripe");
    }

    #[test]
    fn test_groups_by_service_without_name() {
        let collector = ExperimentDataCollector::new();

        collector.publish(outcome(None, "a", true, 1)).unwrap();
        collector.publish(outcome(Some("named"), "a", true, 1)).unwrap();

        let names: Vec<String> = collector
            .snapshots()
            .into_iter()
            .map(|d| d.experiment_name)
            .collect();
        assert_eq!(names, vec!["PaymentService", "named"]);
    }

    #[test]
    fn test_ignores_exposures_and_resets() {
        let collector = ExperimentDataCollector::new();
        let context = InvocationContext::new(ServiceType::new("PaymentService"), "charge", "a");

        collector
            .publish(TrialEvent::Exposure(ExposureEvent::from_context(&context)))
            .unwrap();
        assert!(collector.snapshots().is_empty());

        collector.publish(outcome(None, "a", true, 1)).unwrap();
        assert!(collector.reset("PaymentService").is_some());
        assert!(collector.snapshot("PaymentService").is_none());
    }
}
