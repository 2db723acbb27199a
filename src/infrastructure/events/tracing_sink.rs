//! Sink writing each event as one JSON log line

use tracing::info;

use crate::domain::{EventSink, TrialError, TrialEvent};

pub const TRIAL_EVENTS_TARGET: &str = "trial_events";

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: TrialEvent) -> Result<(), TrialError> {
        let json = serde_json::to_string(&event)
            .map_err(|e| TrialError::publish(format!("failed to serialize event: {}", e)))?;

        info!(target: TRIAL_EVENTS_TARGET, kind = event.kind(), event = %json);
        Ok(())
    }
}
