//! In-memory event sink

use parking_lot::Mutex;

use crate::domain::{EventSink, ExposureEvent, OutcomeEvent, TrialError, TrialEvent};

/// Keeps every published event, mainly for tests and local tooling
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<TrialEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrialEvent> {
        self.events.lock().clone()
    }

    pub fn outcomes(&self) -> Vec<OutcomeEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TrialEvent::Outcome(outcome) => Some(outcome.clone()),
                TrialEvent::Exposure(_) => None,
            })
            .collect()
    }

    pub fn exposures(&self) -> Vec<ExposureEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TrialEvent::Exposure(exposure) => Some(exposure.clone()),
                TrialEvent::Outcome(_) => None,
            })
            .collect()
    }

    /// Remove and return everything published so far
    pub fn drain(&self) -> Vec<TrialEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for InMemoryEventSink {
    fn publish(&self, event: TrialEvent) -> Result<(), TrialError> {
        self.events.lock().push(event);
        Ok(())
    }
}
