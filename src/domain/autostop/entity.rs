//! Aggregated experiment data read by stopping rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// VariantData
// ============================================================================

/// Running counters for one variant of an experiment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantData {
    pub key: String,
    #[serde(default)]
    pub is_control: bool,
    #[serde(default)]
    pub sample_size: u64,
    #[serde(default)]
    pub successes: u64,
    #[serde(default)]
    pub value_sum: f64,
    #[serde(default)]
    pub value_sum_squared: f64,
}

impl VariantData {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn control(key: impl Into<String>) -> Self {
        Self {
            is_control: true,
            ..Self::new(key)
        }
    }

    /// Seed counters, mostly for snapshots loaded from elsewhere
    pub fn with_counts(mut self, sample_size: u64, successes: u64) -> Self {
        self.sample_size = sample_size;
        self.successes = successes.min(sample_size);
        self
    }

    /// Count one observation without a metric value
    pub fn record(&mut self, success: bool) {
        self.sample_size += 1;
        if success {
            self.successes += 1;
        }
    }

    /// Count one observation carrying a metric value
    pub fn record_value(&mut self, success: bool, value: f64) {
        self.record(success);
        self.value_sum += value;
        self.value_sum_squared += value * value;
    }

    /// Fraction of successful observations, 0 when empty
    pub fn conversion_rate(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.successes.min(self.sample_size) as f64 / self.sample_size as f64
    }

    pub fn mean(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.value_sum / self.sample_size as f64
    }

    /// Sample variance (n-1 denominator), 0 below two observations
    pub fn variance(&self) -> f64 {
        if self.sample_size < 2 {
            return 0.0;
        }

        let n = self.sample_size as f64;
        let variance = (self.value_sum_squared - self.value_sum * self.value_sum / n) / (n - 1.0);

        variance.max(0.0)
    }
}

// ============================================================================
// ExperimentData
// ============================================================================

/// Snapshot of every variant of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentData {
    pub experiment_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub variants: Vec<VariantData>,
}

impl ExperimentData {
    pub fn new(experiment_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            started_at,
            variants: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: VariantData) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn variant(&self, key: &str) -> Option<&VariantData> {
        self.variants.iter().find(|v| v.key == key)
    }

    /// Variant for `key`, appended if missing
    pub fn variant_mut(&mut self, key: &str) -> &mut VariantData {
        let index = match self.variants.iter().position(|v| v.key == key) {
            Some(index) => index,
            None => {
                self.variants.push(VariantData::new(key));
                self.variants.len() - 1
            }
        };

        &mut self.variants[index]
    }

    /// The flagged control variant, else the first one
    pub fn control(&self) -> Option<&VariantData> {
        self.variants
            .iter()
            .find(|v| v.is_control)
            .or_else(|| self.variants.first())
    }

    /// Smallest sample size across variants
    pub fn minimum_sample_size(&self) -> Option<u64> {
        self.variants.iter().map(|v| v.sample_size).min()
    }

    pub fn total_samples(&self) -> u64 {
        self.variants.iter().map(|v| v.sample_size).sum()
    }
}

// ============================================================================
// StoppingDecision
// ============================================================================

/// Verdict of a stopping rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppingDecision {
    pub should_stop: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl StoppingDecision {
    pub fn continue_running(reason: impl Into<String>) -> Self {
        Self {
            should_stop: false,
            reason: reason.into(),
            winning_variant: None,
            confidence: None,
        }
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            should_stop: true,
            ..Self::continue_running(reason)
        }
    }

    pub fn with_winner(mut self, key: impl Into<String>) -> Self {
        self.winning_variant = Some(key.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
