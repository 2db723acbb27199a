//! Built-in decorators
//!
//! Default chain positions, outermost first: timing, exposure, outcome,
//! circuit breaker, timeout.

mod circuit_breaker;
mod exposure;
mod outcome;
mod timeout;
mod timing;

use std::sync::Arc;
use std::time::Duration;

pub use circuit_breaker::{
    CircuitBreakerDecoratorFactory, CircuitBreakerRegistry, CircuitState, CIRCUIT_BREAKER_ORDER,
};
pub use exposure::{ExposureDecoratorFactory, ExposureSampler, EXPOSURE_ORDER};
pub use outcome::{OutcomeDecoratorFactory, OUTCOME_ORDER};
pub use timeout::{TimeoutDecoratorFactory, TIMEOUT_ORDER};
pub use timing::{TimingDecoratorFactory, TIMING_ORDER};

use crate::config::DispatchConfig;
use crate::domain::{DecoratorFactory, EventSink};

/// Framework-wide decorators described by `config`.
///
/// Event decorators are only added when a sink is given; the timeout
/// decorator only when a limit is configured.
pub fn standard_decorators(
    config: &DispatchConfig,
    sink: Option<Arc<dyn EventSink>>,
) -> Vec<Arc<dyn DecoratorFactory>> {
    let mut decorators: Vec<Arc<dyn DecoratorFactory>> = vec![Arc::new(TimingDecoratorFactory::new())];

    if let Some(sink) = sink {
        decorators.push(Arc::new(ExposureDecoratorFactory::with_sampler(
            sink.clone(),
            ExposureSampler::new(config.exposure_sample_rate),
        )));
        decorators.push(Arc::new(OutcomeDecoratorFactory::new(sink)));
    }

    if config.circuit_breaker_threshold > 0 {
        decorators.push(Arc::new(CircuitBreakerDecoratorFactory::new(
            config.circuit_breaker_threshold,
            Duration::from_millis(config.circuit_breaker_reset_ms),
        )));
    }

    if let Some(timeout_ms) = config.timeout_ms {
        decorators.push(Arc::new(TimeoutDecoratorFactory::new(Duration::from_millis(
            timeout_ms,
        ))));
    }

    decorators
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use futures::future::BoxFuture;

    use super::*;
    use crate::domain::{DecoratorChain, InvocationContext, Terminal, TrialError, TrialOutput, TrialResult};
    use crate::infrastructure::events::InMemoryEventSink;

    pub fn terminal_ok(value: &'static str) -> Terminal {
        Arc::new(
            move |_context: &InvocationContext| -> BoxFuture<'static, TrialResult> {
                Box::pin(async move { Ok(Box::new(value) as TrialOutput) })
            },
        )
    }

    pub fn terminal_err(message: &'static str) -> Terminal {
        Arc::new(
            move |_context: &InvocationContext| -> BoxFuture<'static, TrialResult> {
                Box::pin(async move { Err(TrialError::failed(message)) })
            },
        )
    }

    pub fn terminal_cancelled() -> Terminal {
        Arc::new(
            |_context: &InvocationContext| -> BoxFuture<'static, TrialResult> {
                Box::pin(async { Err(TrialError::Cancelled) })
            },
        )
    }

    pub fn terminal_slow(delay: Duration) -> Terminal {
        Arc::new(
            move |_context: &InvocationContext| -> BoxFuture<'static, TrialResult> {
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    Ok(Box::new("slow") as TrialOutput)
                })
            },
        )
    }

    #[test]
    fn test_standard_chain_order() {
        let config = DispatchConfig {
            timeout_ms: Some(500),
            ..DispatchConfig::default()
        };
        let sink: Arc<dyn EventSink> = Arc::new(InMemoryEventSink::new());

        let chain = DecoratorChain::from_factories(&standard_decorators(&config, Some(sink)));

        assert_eq!(
            chain.names(),
            &["timing", "exposure", "outcome", "circuit_breaker", "timeout"]
        );
    }

    #[test]
    fn test_minimal_chain() {
        let config = DispatchConfig {
            circuit_breaker_threshold: 0,
            ..DispatchConfig::default()
        };

        let chain = DecoratorChain::from_factories(&standard_decorators(&config, None));

        assert_eq!(chain.names(), &["timing"]);
    }
}
