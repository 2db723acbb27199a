//! Sink publishing to several sinks

use std::sync::Arc;

use tracing::warn;

use crate::domain::{EventSink, TrialError, TrialEvent};

/// Publishes every event to each inner sink; one failing sink does not stop
/// the others
#[derive(Default)]
pub struct FanOutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOutEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanOutEventSink {
    fn publish(&self, event: TrialEvent) -> Result<(), TrialError> {
        let mut failures = 0;

        for sink in &self.sinks {
            if let Err(e) = sink.publish(event.clone()) {
                warn!(kind = event.kind(), error = %e, "Event sink rejected event");
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(TrialError::publish(format!(
                "{} of {} sinks failed",
                failures,
                self.sinks.len()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExposureEvent, InvocationContext, MockEventSink, ServiceType};
    use crate::infrastructure::events::InMemoryEventSink;

    #[test]
    fn test_failure_does_not_stop_other_sinks() {
        let mut failing = MockEventSink::new();
        failing
            .expect_publish()
            .times(1)
            .returning(|_| Err(TrialError::publish("down")));
        let memory = Arc::new(InMemoryEventSink::new());

        let sink = FanOutEventSink::new()
            .with_sink(Arc::new(failing))
            .with_sink(memory.clone());

        let context = InvocationContext::new(ServiceType::new("Checkout"), "pay", "b");
        let error = sink
            .publish(TrialEvent::Exposure(ExposureEvent::from_context(&context)))
            .unwrap_err();

        assert_eq!(error.to_string(), "Publish error: 1 of 2 sinks failed");
        assert_eq!(memory.events().len(), 1);
        assert_eq!(sink.len(), 2);
    }
}
