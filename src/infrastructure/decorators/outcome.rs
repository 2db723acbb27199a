//! Outcome decorator - publishes the result of every attempt

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{
    DecoratorFactory, EventSink, InvocationContext, Next, OutcomeEvent, TrialDecorator,
    TrialEvent, TrialResult,
};

pub const OUTCOME_ORDER: i32 = 20;

pub struct OutcomeDecoratorFactory {
    sink: Arc<dyn EventSink>,
    order: i32,
}

impl OutcomeDecoratorFactory {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            order: OUTCOME_ORDER,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl DecoratorFactory for OutcomeDecoratorFactory {
    fn name(&self) -> &str {
        "outcome"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn create(&self) -> Box<dyn TrialDecorator> {
        Box::new(OutcomeDecorator {
            sink: self.sink.clone(),
        })
    }
}

struct OutcomeDecorator {
    sink: Arc<dyn EventSink>,
}

#[async_trait]
impl TrialDecorator for OutcomeDecorator {
    async fn invoke(&self, context: &InvocationContext, next: Next) -> TrialResult {
        let start = Instant::now();
        let result = next.run(context).await;

        // a cancelled call says nothing about the trial
        if matches!(&result, Err(e) if e.is_cancelled()) {
            return result;
        }

        let event = OutcomeEvent::from_context(context, start.elapsed().as_millis() as u64);
        let event = match &result {
            Ok(_) => event,
            Err(e) => event.with_error(e),
        };

        if let Err(e) = self.sink.publish(TrialEvent::Outcome(event)) {
            warn!(
                service = %context.service_type(),
                trial_key = %context.trial_key(),
                error = %e,
                "Failed to publish outcome"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecoratorChain, MockEventSink, ServiceType, TrialError};
    use crate::infrastructure::decorators::tests::{terminal_cancelled, terminal_err, terminal_ok};
    use crate::infrastructure::events::InMemoryEventSink;

    fn context() -> InvocationContext {
        InvocationContext::new(ServiceType::new("PaymentService"), "charge", "adyen")
            .with_experiment_name(Some("psp".to_string()))
    }

    #[tokio::test]
    async fn test_publishes_success_and_failure() {
        let sink = Arc::new(InMemoryEventSink::new());
        let chain = DecoratorChain::from_decorators(vec![
            OutcomeDecoratorFactory::new(sink.clone()).create(),
        ]);

        chain.invoke(&context(), terminal_ok("ok")).await.unwrap();
        chain.invoke(&context(), terminal_err("declined")).await.unwrap_err();

        let outcomes = sink.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].experiment_name.as_deref(), Some("psp"));
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[1].error.as_deref(), Some("Trial failed: declined"));
    }

    #[tokio::test]
    async fn test_cancelled_attempt_is_not_an_outcome() {
        let sink = Arc::new(InMemoryEventSink::new());
        let chain = DecoratorChain::from_decorators(vec![
            OutcomeDecoratorFactory::new(sink.clone()).create(),
        ]);

        let error = chain.invoke(&context(), terminal_cancelled()).await.unwrap_err();

        assert!(error.is_cancelled());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_the_call() {
        let mut sink = MockEventSink::new();
        sink.expect_publish()
            .times(1)
            .returning(|_| Err(TrialError::publish("backplane down")));

        let chain = DecoratorChain::from_decorators(vec![
            OutcomeDecoratorFactory::new(Arc::new(sink)).create(),
        ]);

        let output = chain.invoke(&context(), terminal_ok("ok")).await.unwrap();
        assert_eq!(*output.downcast::<&str>().unwrap(), "ok");
    }
}
