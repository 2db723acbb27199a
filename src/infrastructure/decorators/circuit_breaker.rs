//! Circuit breaker decorator
//!
//! One breaker per service and trial key. After `threshold` consecutive
//! failures the circuit opens and attempts fail fast with `CircuitOpen`;
//! once `reset` has elapsed since the last failure, attempts are let
//! through again (half-open) and the first success closes the circuit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::{
    DecoratorFactory, InvocationContext, Next, TrialDecorator, TrialError, TrialResult,
};
use crate::infrastructure::observability::record_circuit_state;

pub const CIRCUIT_BREAKER_ORDER: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Breaker for a single trial
#[derive(Debug)]
struct CircuitBreaker {
    failure_count: AtomicU32,
    last_failure_ms: AtomicU64,
    threshold: u32,
    reset_ms: u64,
    epoch: Instant,
}

impl CircuitBreaker {
    fn new(threshold: u32, reset_ms: u64) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(0),
            threshold: threshold.max(1),
            reset_ms,
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn state(&self) -> CircuitState {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return CircuitState::Closed;
        }

        let last_failure = self.last_failure_ms.load(Ordering::Relaxed);

        if self.now_ms().saturating_sub(last_failure) >= self.reset_ms {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    /// Returns whether the circuit was open or half-open before
    fn record_success(&self) -> bool {
        self.failure_count.swap(0, Ordering::Relaxed) >= self.threshold
    }

    /// Returns whether this failure opened the circuit
    fn record_failure(&self) -> bool {
        self.last_failure_ms.store(self.now_ms(), Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed) + 1 == self.threshold
    }
}

/// Shared table of breakers, keyed by service and trial
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    threshold: u32,
    reset: Duration,
}

impl CircuitBreakerRegistry {
    pub fn new(threshold: u32, reset: Duration) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            threshold,
            reset,
        }
    }

    /// Current state for a trial; closed when it has never failed
    pub fn state(&self, service_type: &str, trial_key: &str) -> CircuitState {
        self.breakers
            .read()
            .get(&Self::key(service_type, trial_key))
            .map_or(CircuitState::Closed, |breaker| breaker.state())
    }

    pub fn reset(&self, service_type: &str, trial_key: &str) {
        self.breakers
            .write()
            .remove(&Self::key(service_type, trial_key));
    }

    fn breaker(&self, service_type: &str, trial_key: &str) -> Arc<CircuitBreaker> {
        let key = Self::key(service_type, trial_key);

        if let Some(breaker) = self.breakers.read().get(&key) {
            return breaker.clone();
        }

        self.breakers
            .write()
            .entry(key)
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    self.threshold,
                    self.reset.as_millis() as u64,
                ))
            })
            .clone()
    }

    fn key(service_type: &str, trial_key: &str) -> String {
        format!("{}#{}", service_type, trial_key)
    }
}

pub struct CircuitBreakerDecoratorFactory {
    registry: Arc<CircuitBreakerRegistry>,
    order: i32,
}

impl CircuitBreakerDecoratorFactory {
    pub fn new(threshold: u32, reset: Duration) -> Self {
        Self::with_registry(Arc::new(CircuitBreakerRegistry::new(threshold, reset)))
    }

    pub fn with_registry(registry: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            registry,
            order: CIRCUIT_BREAKER_ORDER,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.registry
    }
}

impl DecoratorFactory for CircuitBreakerDecoratorFactory {
    fn name(&self) -> &str {
        "circuit_breaker"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn create(&self) -> Box<dyn TrialDecorator> {
        Box::new(CircuitBreakerDecorator {
            registry: self.registry.clone(),
        })
    }
}

struct CircuitBreakerDecorator {
    registry: Arc<CircuitBreakerRegistry>,
}

#[async_trait]
impl TrialDecorator for CircuitBreakerDecorator {
    async fn invoke(&self, context: &InvocationContext, next: Next) -> TrialResult {
        let service = context.service_type().as_str();
        let trial_key = context.trial_key();
        let breaker = self.registry.breaker(service, trial_key);

        if breaker.state() == CircuitState::Open {
            return Err(TrialError::CircuitOpen {
                service_type: service.to_string(),
                method: context.method().to_string(),
                trial_key: trial_key.to_string(),
            });
        }

        let result = next.run(context).await;

        match &result {
            Ok(_) => {
                if breaker.record_success() {
                    info!(service = %service, trial_key = %trial_key, "Circuit closed");
                    record_circuit_state(service, trial_key, false);
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(_) => {
                if breaker.record_failure() {
                    warn!(
                        service = %service,
                        trial_key = %trial_key,
                        threshold = breaker.threshold,
                        "Circuit opened"
                    );
                    record_circuit_state(service, trial_key, true);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecoratorChain, ServiceType};
    use crate::infrastructure::decorators::tests::{terminal_err, terminal_ok};

    fn context(trial_key: &str) -> InvocationContext {
        InvocationContext::new(ServiceType::new("PaymentService"), "charge", trial_key)
    }

    fn chain(factory: &CircuitBreakerDecoratorFactory) -> DecoratorChain {
        DecoratorChain::from_decorators(vec![factory.create()])
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold_and_recovers() {
        let factory = CircuitBreakerDecoratorFactory::new(2, Duration::from_secs(30));
        let registry = factory.registry().clone();

        for _ in 0..2 {
            chain(&factory)
                .invoke(&context("adyen"), terminal_err("down"))
                .await
                .unwrap_err();
        }
        assert_eq!(registry.state("PaymentService", "adyen"), CircuitState::Open);

        let error = chain(&factory)
            .invoke(&context("adyen"), terminal_ok("ok"))
            .await
            .unwrap_err();
        assert!(matches!(error, TrialError::CircuitOpen { ref trial_key, .. } if trial_key == "adyen"));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(registry.state("PaymentService", "adyen"), CircuitState::HalfOpen);

        chain(&factory)
            .invoke(&context("adyen"), terminal_ok("ok"))
            .await
            .unwrap();
        assert_eq!(registry.state("PaymentService", "adyen"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let factory = CircuitBreakerDecoratorFactory::new(1, Duration::from_secs(10));
        let registry = factory.registry().clone();

        chain(&factory).invoke(&context("a"), terminal_err("x")).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(registry.state("PaymentService", "a"), CircuitState::HalfOpen);

        chain(&factory).invoke(&context("a"), terminal_err("x")).await.unwrap_err();
        assert_eq!(registry.state("PaymentService", "a"), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_breakers_are_per_trial() {
        let factory = CircuitBreakerDecoratorFactory::new(1, Duration::from_secs(60));

        chain(&factory).invoke(&context("a"), terminal_err("x")).await.unwrap_err();

        assert_eq!(factory.registry().state("PaymentService", "a"), CircuitState::Open);
        chain(&factory).invoke(&context("b"), terminal_ok("ok")).await.unwrap();

        factory.registry().reset("PaymentService", "a");
        assert_eq!(factory.registry().state("PaymentService", "a"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_success_resets_count() {
        let factory = CircuitBreakerDecoratorFactory::new(2, Duration::from_secs(60));

        chain(&factory).invoke(&context("a"), terminal_err("x")).await.unwrap_err();
        chain(&factory).invoke(&context("a"), terminal_ok("ok")).await.unwrap();
        chain(&factory).invoke(&context("a"), terminal_err("x")).await.unwrap_err();

        assert_eq!(factory.registry().state("PaymentService", "a"), CircuitState::Closed);
    }
}
