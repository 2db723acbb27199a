//! Timeout decorator
//!
//! The attempt is raced against a timer. On expiry the attempt future is
//! dropped, which stops the trial at its next await point. Work the trial
//! handed to spawned tasks or blocking threads is not stopped and keeps
//! running in the background.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout, Instant};
use tracing::warn;

use crate::domain::{
    DecoratorFactory, InvocationContext, Next, TrialDecorator, TrialError, TrialResult,
};

pub const TIMEOUT_ORDER: i32 = 40;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutDecoratorFactory {
    limit: Duration,
    order: i32,
}

impl TimeoutDecoratorFactory {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            order: TIMEOUT_ORDER,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl DecoratorFactory for TimeoutDecoratorFactory {
    fn name(&self) -> &str {
        "timeout"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn create(&self) -> Box<dyn TrialDecorator> {
        Box::new(TimeoutDecorator { limit: self.limit })
    }
}

struct TimeoutDecorator {
    limit: Duration,
}

#[async_trait]
impl TrialDecorator for TimeoutDecorator {
    async fn invoke(&self, context: &InvocationContext, next: Next) -> TrialResult {
        let start = Instant::now();

        match timeout(self.limit, next.run(context)).await {
            Ok(result) => result,
            Err(_) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;

                warn!(
                    service = %context.service_type(),
                    method = %context.method(),
                    trial_key = %context.trial_key(),
                    elapsed_ms,
                    "Trial timed out"
                );

                Err(TrialError::Timeout {
                    service_type: context.service_type().to_string(),
                    method: context.method().to_string(),
                    trial_key: context.trial_key().to_string(),
                    elapsed_ms,
                    limit_ms: self.limit.as_millis() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecoratorChain, ServiceType};
    use crate::infrastructure::decorators::tests::{terminal_ok, terminal_slow};

    fn chain(limit_ms: u64) -> DecoratorChain {
        DecoratorChain::from_decorators(vec![
            TimeoutDecoratorFactory::new(Duration::from_millis(limit_ms)).create(),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_trial_times_out_with_context() {
        let context = InvocationContext::new(ServiceType::new("Search"), "query", "vector");

        let error = chain(100)
            .invoke(&context, terminal_slow(Duration::from_secs(5)))
            .await
            .unwrap_err();

        match error {
            TrialError::Timeout {
                service_type,
                method,
                trial_key,
                elapsed_ms,
                limit_ms,
            } => {
                assert_eq!(service_type, "Search");
                assert_eq!(method, "query");
                assert_eq!(trial_key, "vector");
                assert_eq!(limit_ms, 100);
                assert!(elapsed_ms >= 100);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_trial_passes() {
        let context = InvocationContext::new(ServiceType::new("Search"), "query", "bm25");

        let output = chain(100)
            .invoke(&context, terminal_slow(Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(*output.downcast::<&str>().unwrap(), "slow");

        chain(100).invoke(&context, terminal_ok("fast")).await.unwrap();
    }
}
