//! Stopping rules and the statistics behind them

mod rules;
pub mod statistical;

pub use rules::{
    MinimumSampleSizeRule, StatisticalSignificanceRule, DEFAULT_CONFIDENCE_LEVEL,
    DEFAULT_SIGNIFICANCE_SAMPLE_SIZE,
};

use crate::config::AutoStopConfig;
use crate::domain::StoppingRule;

/// The built-in rules with thresholds from `config`
pub fn configured_rules(config: &AutoStopConfig) -> Vec<Box<dyn StoppingRule>> {
    vec![
        Box::new(MinimumSampleSizeRule::new(config.minimum_sample_size)),
        Box::new(
            StatisticalSignificanceRule::new(config.confidence_level)
                .with_minimum_sample_size(config.minimum_sample_size),
        ),
    ]
}
