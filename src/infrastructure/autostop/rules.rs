//! Built-in stopping rules

use tracing::{debug, warn};

use super::statistical::{two_proportion_z, two_tailed_p_value};
use crate::domain::{ExperimentData, StoppingDecision, StoppingRule, VariantData};

/// Eligible to stop once every variant has at least `minimum` samples
#[derive(Debug, Clone, Copy)]
pub struct MinimumSampleSizeRule {
    minimum: u64,
}

impl MinimumSampleSizeRule {
    pub fn new(minimum: u64) -> Self {
        Self { minimum }
    }

    pub fn minimum(&self) -> u64 {
        self.minimum
    }
}

impl StoppingRule for MinimumSampleSizeRule {
    fn name(&self) -> &str {
        "minimum_sample_size"
    }

    fn evaluate(&self, data: &ExperimentData) -> StoppingDecision {
        let Some(smallest) = data.minimum_sample_size() else {
            return StoppingDecision::continue_running("No variant data recorded yet");
        };

        if smallest < self.minimum {
            return StoppingDecision::continue_running(format!(
                "Minimum sample size not reached: smallest variant has {} of {} required samples",
                smallest, self.minimum
            ));
        }

        StoppingDecision::stop(format!(
            "Every variant reached the minimum sample size of {}",
            self.minimum
        ))
    }
}

pub const DEFAULT_SIGNIFICANCE_SAMPLE_SIZE: u64 = 100;

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Two-proportion z-test of each treatment against the control
#[derive(Debug, Clone, Copy)]
pub struct StatisticalSignificanceRule {
    confidence_level: f64,
    minimum_sample_size: u64,
}

impl StatisticalSignificanceRule {
    pub fn new(confidence_level: f64) -> Self {
        Self {
            confidence_level: normalize_confidence(confidence_level),
            minimum_sample_size: DEFAULT_SIGNIFICANCE_SAMPLE_SIZE,
        }
    }

    pub fn with_minimum_sample_size(mut self, minimum: u64) -> Self {
        self.minimum_sample_size = minimum;
        self
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    /// The treatment with the largest absolute z-score against `control`
    fn strongest<'a>(data: &'a ExperimentData, control: &VariantData) -> Option<(&'a VariantData, f64)> {
        data.variants
            .iter()
            .filter(|variant| variant.key != control.key)
            .map(|variant| (variant, two_proportion_z(control, variant)))
            .fold(None, |best, (variant, z)| match best {
                Some((_, best_z)) if f64::abs(best_z) >= z.abs() => best,
                _ => Some((variant, z)),
            })
    }
}

/// Clamp to `[0, 1]`; NaN falls back to the default level
fn normalize_confidence(level: f64) -> f64 {
    if level.is_nan() {
        warn!(
            default = DEFAULT_CONFIDENCE_LEVEL,
            "Confidence level is NaN, using the default"
        );
        return DEFAULT_CONFIDENCE_LEVEL;
    }

    level.clamp(0.0, 1.0)
}

impl StoppingRule for StatisticalSignificanceRule {
    fn name(&self) -> &str {
        "statistical_significance"
    }

    fn evaluate(&self, data: &ExperimentData) -> StoppingDecision {
        if data.variants.len() < 2 {
            return StoppingDecision::continue_running(
                "At least two variants are required for a significance test",
            );
        }

        let smallest = data.minimum_sample_size().unwrap_or(0);
        if smallest < self.minimum_sample_size {
            return StoppingDecision::continue_running(format!(
                "Waiting for {} samples per variant, smallest has {}",
                self.minimum_sample_size, smallest
            ));
        }

        let Some(control) = data.control() else {
            return StoppingDecision::continue_running("No control variant");
        };
        let Some((treatment, z)) = Self::strongest(data, control) else {
            return StoppingDecision::continue_running("No treatment variant");
        };

        let p_value = two_tailed_p_value(z);
        let confidence = 1.0 - p_value;

        debug!(
            experiment = %data.experiment_name,
            control = %control.key,
            treatment = %treatment.key,
            z,
            p_value,
            "Significance evaluated"
        );

        if confidence >= self.confidence_level {
            let winner = if z > 0.0 { &treatment.key } else { &control.key };

            StoppingDecision::stop(format!(
                "Statistical significance reached: p-value {:.4} for '{}' against control '{}'",
                p_value, treatment.key, control.key
            ))
            .with_winner(winner.clone())
            .with_confidence(confidence)
        } else {
            StoppingDecision::continue_running(format!(
                "Not yet significant: p-value {:.4} for '{}' against control '{}' (needs confidence {})",
                p_value, treatment.key, control.key, self.confidence_level
            ))
            .with_confidence(confidence)
        }
    }
}
