//! Timing decorator - logs and records the duration of every attempt

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{DecoratorFactory, InvocationContext, Next, TrialDecorator, TrialResult};
use crate::infrastructure::observability::{record_trial_invocation, TrialMetricParams};

pub const TIMING_ORDER: i32 = 0;

#[derive(Debug, Clone, Copy)]
pub struct TimingDecoratorFactory {
    order: i32,
}

impl TimingDecoratorFactory {
    pub fn new() -> Self {
        Self {
            order: TIMING_ORDER,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl Default for TimingDecoratorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoratorFactory for TimingDecoratorFactory {
    fn name(&self) -> &str {
        "timing"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn create(&self) -> Box<dyn TrialDecorator> {
        Box::new(TimingDecorator)
    }
}

struct TimingDecorator;

#[async_trait]
impl TrialDecorator for TimingDecorator {
    async fn invoke(&self, context: &InvocationContext, next: Next) -> TrialResult {
        let start = Instant::now();
        let result = next.run(context).await;
        let duration = start.elapsed();

        record_trial_invocation(TrialMetricParams {
            service: context.service_type().short_name(),
            method: context.method(),
            trial_key: context.trial_key(),
            duration,
            success: result.is_ok(),
        });

        match &result {
            Ok(_) => debug!(
                service = %context.service_type(),
                method = %context.method(),
                trial_key = %context.trial_key(),
                attempt = context.attempt(),
                duration_ms = duration.as_millis() as u64,
                "Trial completed"
            ),
            Err(e) => warn!(
                service = %context.service_type(),
                method = %context.method(),
                trial_key = %context.trial_key(),
                attempt = context.attempt(),
                duration_ms = duration.as_millis() as u64,
                error = %e,
                "Trial failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecoratorChain, ServiceType, TrialError};
    use crate::infrastructure::decorators::tests::{terminal_err, terminal_ok};

    #[tokio::test]
    async fn test_passes_results_through() {
        let chain = DecoratorChain::from_decorators(vec![TimingDecoratorFactory::new().create()]);
        let context = InvocationContext::new(ServiceType::new("Checkout"), "pay", "a");

        let output = chain.invoke(&context, terminal_ok("paid")).await.unwrap();
        assert_eq!(*output.downcast::<&str>().unwrap(), "paid");

        let error = chain.invoke(&context, terminal_err("declined")).await.unwrap_err();
        assert!(matches!(error, TrialError::Failed { .. }));
    }

    #[test]
    fn test_default_order() {
        assert_eq!(TimingDecoratorFactory::default().order(), TIMING_ORDER);
        assert_eq!(TimingDecoratorFactory::new().with_order(-1).order(), -1);
    }
}
