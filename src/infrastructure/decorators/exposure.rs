//! Exposure decorator - records that a caller was shown a trial

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::domain::{
    DecoratorFactory, EventSink, ExposureEvent, InvocationContext, Next, TrialDecorator,
    TrialEvent, TrialResult,
};

pub const EXPOSURE_ORDER: i32 = 10;

/// Decides which exposures are logged.
///
/// One generator is shared by every decorator created from a factory, so
/// access goes through a lock.
#[derive(Debug)]
pub struct ExposureSampler {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl ExposureSampler {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: normalize_rate(rate),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sampler
    pub fn seeded(rate: f64, seed: u64) -> Self {
        Self {
            rate: normalize_rate(rate),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn sample(&self) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        if self.rate <= 0.0 {
            return false;
        }

        self.rng.lock().gen_bool(self.rate)
    }
}

/// Clamp to `[0, 1]`; NaN logs every exposure
fn normalize_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        warn!("Exposure sample rate is NaN, logging every exposure");
        return 1.0;
    }

    rate.clamp(0.0, 1.0)
}

pub struct ExposureDecoratorFactory {
    sink: Arc<dyn EventSink>,
    sampler: Arc<ExposureSampler>,
    order: i32,
}

impl ExposureDecoratorFactory {
    /// Log every exposure
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_sampler(sink, ExposureSampler::new(1.0))
    }

    pub fn with_sampler(sink: Arc<dyn EventSink>, sampler: ExposureSampler) -> Self {
        Self {
            sink,
            sampler: Arc::new(sampler),
            order: EXPOSURE_ORDER,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl DecoratorFactory for ExposureDecoratorFactory {
    fn name(&self) -> &str {
        "exposure"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn create(&self) -> Box<dyn TrialDecorator> {
        Box::new(ExposureDecorator {
            sink: self.sink.clone(),
            sampler: self.sampler.clone(),
        })
    }
}

struct ExposureDecorator {
    sink: Arc<dyn EventSink>,
    sampler: Arc<ExposureSampler>,
}

#[async_trait]
impl TrialDecorator for ExposureDecorator {
    async fn invoke(&self, context: &InvocationContext, next: Next) -> TrialResult {
        if self.sampler.sample() {
            let event = TrialEvent::Exposure(ExposureEvent::from_context(context));

            if let Err(e) = self.sink.publish(event) {
                warn!(
                    service = %context.service_type(),
                    trial_key = %context.trial_key(),
                    error = %e,
                    "Failed to publish exposure"
                );
            }
        }

        next.run(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallScope, DecoratorChain, ServiceType};
    use crate::infrastructure::decorators::tests::terminal_ok;
    use crate::infrastructure::events::InMemoryEventSink;

    async fn run(sampler: ExposureSampler, calls: usize) -> usize {
        let sink = Arc::new(InMemoryEventSink::new());
        let factories: Vec<Arc<dyn DecoratorFactory>> = vec![Arc::new(
            ExposureDecoratorFactory::with_sampler(sink.clone(), sampler),
        )];
        let context = InvocationContext::new(ServiceType::new("Checkout"), "pay", "b");

        for _ in 0..calls {
            DecoratorChain::from_factories(&factories)
                .invoke(&context, terminal_ok("ok"))
                .await
                .unwrap();
        }

        sink.exposures().len()
    }

    #[tokio::test]
    async fn test_full_rate_logs_everything() {
        assert_eq!(run(ExposureSampler::new(1.0), 10).await, 10);
    }

    #[tokio::test]
    async fn test_zero_rate_logs_nothing() {
        assert_eq!(run(ExposureSampler::new(0.0), 10).await, 0);
    }

    #[tokio::test]
    async fn test_partial_rate_samples() {
        let logged = run(ExposureSampler::seeded(0.5, 7), 400).await;

        assert!(logged > 120 && logged < 280, "logged {}", logged);
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(ExposureSampler::new(3.0).rate(), 1.0);
        assert_eq!(ExposureSampler::new(-1.0).rate(), 0.0);
        assert_eq!(ExposureSampler::new(f64::INFINITY).rate(), 1.0);
    }

    #[tokio::test]
    async fn test_nan_rate_logs_everything() {
        let sampler = ExposureSampler::seeded(f64::NAN, 3);

        assert_eq!(sampler.rate(), 1.0);
        assert!(sampler.sample());
        assert_eq!(run(ExposureSampler::new(f64::NAN), 5).await, 5);
    }

    #[tokio::test]
    async fn test_exposure_event_contents() {
        let sink = Arc::new(InMemoryEventSink::new());
        let chain =
            DecoratorChain::from_decorators(vec![ExposureDecoratorFactory::new(sink.clone()).create()]);
        let context = InvocationContext::new(ServiceType::new("Checkout"), "pay", "b")
            .with_scope(CallScope::new().with_identity("u1"));

        chain.invoke(&context, terminal_ok("ok")).await.unwrap();

        let exposures = sink.exposures();
        assert_eq!(exposures.len(), 1);
        assert_eq!(exposures[0].trial_key, "b");
        assert_eq!(exposures[0].identity.as_deref(), Some("u1"));
    }
}
