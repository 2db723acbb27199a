//! Experiment registration entities

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::OnErrorPolicy;
use crate::domain::invocation::DecoratorFactory;
use crate::domain::selection::modes;
use crate::domain::{ServiceType, TrialError};

// ============================================================================
// ExperimentDefinition
// ============================================================================

/// Static description of a service's experiment, independent of the trial implementations.
///
/// This is what the conflict detector validates and what can be loaded from a
/// definitions file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub service_type: ServiceType,
    /// Explicit selector name; the selection mode derives one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<String>,
    #[serde(default = "default_selection_mode")]
    pub selection_mode: String,
    pub default_trial_key: String,
    /// Trial keys in registration order
    pub trial_keys: Vec<String>,
    #[serde(default)]
    pub on_error: OnErrorPolicy,
    /// Inclusive start of the active window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive end of the active window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_name: Option<String>,
    /// Share of identities (0-100) enrolled in the experiment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_percentage: Option<u8>,
}

fn default_selection_mode() -> String {
    modes::CONFIGURATION_VALUE.to_string()
}

impl ExperimentDefinition {
    pub fn new(service_type: ServiceType, default_trial_key: impl Into<String>) -> Self {
        let default_trial_key = default_trial_key.into();

        Self {
            service_type,
            selector_name: None,
            selection_mode: default_selection_mode(),
            trial_keys: vec![default_trial_key.clone()],
            default_trial_key,
            on_error: OnErrorPolicy::default(),
            start_time: None,
            end_time: None,
            experiment_name: None,
            traffic_percentage: None,
        }
    }

    pub fn with_trial_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();

        if !self.trial_keys.contains(&key) {
            self.trial_keys.push(key);
        }
        self
    }

    pub fn with_selector_name(mut self, name: impl Into<String>) -> Self {
        self.selector_name = Some(name.into());
        self
    }

    pub fn with_selection_mode(mut self, mode: impl Into<String>) -> Self {
        self.selection_mode = mode.into();
        self
    }

    pub fn with_on_error(mut self, policy: OnErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_window(
        mut self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = Some(name.into());
        self
    }

    pub fn with_traffic_percentage(mut self, percentage: u8) -> Self {
        self.traffic_percentage = Some(percentage);
        self
    }

    pub fn has_trial(&self, key: &str) -> bool {
        self.trial_keys.iter().any(|k| k == key)
    }

    /// Whether neither a start nor an end bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }

    /// Whether `at` falls inside `[start_time, end_time)`
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time.is_none_or(|start| start <= at) && self.end_time.is_none_or(|end| at < end)
    }

    /// Half-open interval overlap with unbounded ends treated as infinite
    pub fn overlaps(&self, other: &ExperimentDefinition) -> bool {
        let starts_before_other_ends = match (self.start_time, other.end_time) {
            (Some(start), Some(end)) => start < end,
            _ => true,
        };
        let other_starts_before_end = match (other.start_time, self.end_time) {
            (Some(start), Some(end)) => start < end,
            _ => true,
        };

        starts_before_other_ends && other_starts_before_end
    }

    /// Name used in diagnostics: the experiment name, or the service type
    pub fn display_name(&self) -> &str {
        self.experiment_name
            .as_deref()
            .unwrap_or(self.service_type.as_str())
    }

    /// Check the structural invariants of a single definition
    pub fn validate(&self) -> Result<(), TrialError> {
        if self.trial_keys.is_empty() {
            return Err(TrialError::invalid_registration(format!(
                "'{}' has no trials",
                self.service_type
            )));
        }

        if let Some((index, key)) = self
            .trial_keys
            .iter()
            .enumerate()
            .find(|(index, key)| self.trial_keys[..*index].contains(*key))
        {
            return Err(TrialError::invalid_registration(format!(
                "'{}' trial '{}' is listed more than once (position {})",
                self.service_type, key, index
            )));
        }

        if !self.has_trial(&self.default_trial_key) {
            return Err(TrialError::invalid_registration(format!(
                "'{}' default trial '{}' is not registered",
                self.service_type, self.default_trial_key
            )));
        }

        if let Some(percentage) = self.traffic_percentage {
            if percentage > 100 {
                return Err(TrialError::invalid_registration(format!(
                    "'{}' traffic percentage {} exceeds 100",
                    self.service_type, percentage
                )));
            }
        }

        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                return Err(TrialError::invalid_registration(format!(
                    "'{}' window start {} is not before end {}",
                    self.service_type, start, end
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// ExperimentRegistration
// ============================================================================

/// A service's experiment definition together with its trial implementations.
///
/// `S` is the service interface, usually a trait object such as `dyn PaymentService`.
/// Immutable once built.
pub struct ExperimentRegistration<S: ?Sized> {
    definition: ExperimentDefinition,
    trials: IndexMap<String, Arc<S>>,
    decorators: Vec<Arc<dyn DecoratorFactory>>,
}

impl<S: ?Sized + 'static> ExperimentRegistration<S> {
    /// Start building a registration for service `S`
    pub fn builder() -> ExperimentRegistrationBuilder<S> {
        ExperimentRegistrationBuilder::new()
    }
}

impl<S: ?Sized> ExperimentRegistration<S> {
    pub fn definition(&self) -> &ExperimentDefinition {
        &self.definition
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.definition.service_type
    }

    pub fn trial(&self, key: &str) -> Option<&Arc<S>> {
        self.trials.get(key)
    }

    pub fn trial_keys(&self) -> &[String] {
        &self.definition.trial_keys
    }

    pub fn default_trial_key(&self) -> &str {
        &self.definition.default_trial_key
    }

    /// Decorators that apply only to this service
    pub fn decorators(&self) -> &[Arc<dyn DecoratorFactory>] {
        &self.decorators
    }
}

impl<S: ?Sized> fmt::Debug for ExperimentRegistration<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentRegistration")
            .field("definition", &self.definition)
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

/// Builder for [`ExperimentRegistration`]
pub struct ExperimentRegistrationBuilder<S: ?Sized> {
    service_type: ServiceType,
    selector_name: Option<String>,
    selection_mode: String,
    default_trial_key: Option<String>,
    trials: IndexMap<String, Arc<S>>,
    on_error: OnErrorPolicy,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    experiment_name: Option<String>,
    traffic_percentage: Option<u8>,
    decorators: Vec<Arc<dyn DecoratorFactory>>,
}

impl<S: ?Sized + 'static> ExperimentRegistrationBuilder<S> {
    fn new() -> Self {
        Self {
            service_type: ServiceType::of::<S>(),
            selector_name: None,
            selection_mode: default_selection_mode(),
            default_trial_key: None,
            trials: IndexMap::new(),
            on_error: OnErrorPolicy::default(),
            start_time: None,
            end_time: None,
            experiment_name: None,
            traffic_percentage: None,
            decorators: Vec::new(),
        }
    }
}

impl<S: ?Sized> ExperimentRegistrationBuilder<S> {
    /// Add a trial; a later trial with the same key replaces the earlier one
    pub fn trial(mut self, key: impl Into<String>, implementation: Arc<S>) -> Self {
        self.trials.insert(key.into(), implementation);
        self
    }

    /// Add the default trial
    pub fn default_trial(mut self, key: impl Into<String>, implementation: Arc<S>) -> Self {
        let key = key.into();
        self.default_trial_key = Some(key.clone());
        self.trial(key, implementation)
    }

    pub fn default_trial_key(mut self, key: impl Into<String>) -> Self {
        self.default_trial_key = Some(key.into());
        self
    }

    pub fn selector_name(mut self, name: impl Into<String>) -> Self {
        self.selector_name = Some(name.into());
        self
    }

    pub fn selection_mode(mut self, mode: impl Into<String>) -> Self {
        self.selection_mode = mode.into();
        self
    }

    pub fn on_error(mut self, policy: OnErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn active_from(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn active_until(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = Some(name.into());
        self
    }

    pub fn traffic_percentage(mut self, percentage: u8) -> Self {
        self.traffic_percentage = Some(percentage);
        self
    }

    /// Add a decorator applied only to this service
    pub fn decorator(mut self, factory: Arc<dyn DecoratorFactory>) -> Self {
        self.decorators.push(factory);
        self
    }

    /// Build the registration, checking its invariants
    pub fn build(self) -> Result<ExperimentRegistration<S>, TrialError> {
        let default_trial_key = self.default_trial_key.ok_or_else(|| {
            TrialError::invalid_registration(format!(
                "'{}' has no default trial",
                self.service_type
            ))
        })?;

        let definition = ExperimentDefinition {
            service_type: self.service_type,
            selector_name: self.selector_name,
            selection_mode: self.selection_mode,
            default_trial_key,
            trial_keys: self.trials.keys().cloned().collect(),
            on_error: self.on_error,
            start_time: self.start_time,
            end_time: self.end_time,
            experiment_name: self.experiment_name,
            traffic_percentage: self.traffic_percentage,
        };

        definition.validate()?;

        // Fallback keys are checked with the other registrations at dispatcher build
        Ok(ExperimentRegistration {
            definition,
            trials: self.trials,
            decorators: self.decorators,
        })
    }
}
