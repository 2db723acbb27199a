//! Bounded channel sink, for shipping events to a background consumer

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{EventSink, TrialError, TrialEvent};
use crate::infrastructure::observability::record_dropped_event;

/// Hands events to a bounded tokio channel without waiting.
///
/// When the consumer falls behind, events are dropped rather than slowing
/// down trial calls.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::Sender<TrialEvent>,
}

impl ChannelEventSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TrialEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: TrialEvent) -> Result<(), TrialError> {
        let kind = event.kind();

        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                record_dropped_event("channel", kind);
                Err(TrialError::publish(format!("event channel full, {} dropped", kind)))
            }
            Err(TrySendError::Closed(_)) => {
                record_dropped_event("channel", kind);
                Err(TrialError::publish("event channel closed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::domain::{ExposureEvent, InvocationContext, ServiceType};

    fn event() -> TrialEvent {
        let context = InvocationContext::new(ServiceType::new("Checkout"), "pay", "b");
        TrialEvent::Exposure(ExposureEvent::from_context(&context))
    }

    #[tokio::test]
    async fn test_delivers_events() {
        let (sink, mut receiver) = ChannelEventSink::new(4);

        assert_ok!(sink.publish(event()));

        assert_eq!(receiver.recv().await.unwrap().trial_key(), "b");
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_blocking() {
        let (sink, mut receiver) = ChannelEventSink::new(1);

        assert_ok!(sink.publish(event()));
        let error = assert_err!(sink.publish(event()));

        assert!(matches!(error, TrialError::Publish { .. }));
        assert!(receiver.recv().await.is_some());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel() {
        let (sink, receiver) = ChannelEventSink::new(1);
        drop(receiver);

        assert_eq!(
            sink.publish(event()).unwrap_err().to_string(),
            "Publish error: event channel closed"
        );
    }
}
