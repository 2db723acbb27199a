//! Trial events emitted by decorators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::domain::TrialError;
use crate::domain::invocation::InvocationContext;

/// Result of one attempt, as seen by the outcome decorator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub invocation_id: Uuid,
    pub service_type: String,
    pub method: String,
    pub trial_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_name: Option<String>,
    pub attempt: u32,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl OutcomeEvent {
    pub fn from_context(context: &InvocationContext, duration_ms: u64) -> Self {
        Self {
            invocation_id: context.invocation_id(),
            service_type: context.service_type().to_string(),
            method: context.method().to_string(),
            trial_key: context.trial_key().to_string(),
            experiment_name: context.experiment_name().map(str::to_string),
            attempt: context.attempt(),
            success: true,
            duration_ms,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: &TrialError) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }

    /// Name the collector groups outcomes under
    pub fn experiment_key(&self) -> &str {
        self.experiment_name.as_deref().unwrap_or(&self.service_type)
    }
}

/// A caller was exposed to a trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureEvent {
    pub invocation_id: Uuid,
    pub service_type: String,
    pub method: String,
    pub selector_name: String,
    pub trial_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}

impl ExposureEvent {
    pub fn from_context(context: &InvocationContext) -> Self {
        Self {
            invocation_id: context.invocation_id(),
            service_type: context.service_type().to_string(),
            method: context.method().to_string(),
            selector_name: context.selector_name().to_string(),
            trial_key: context.trial_key().to_string(),
            experiment_name: context.experiment_name().map(str::to_string),
            identity: context.scope().identity().map(str::to_string),
            attempt: context.attempt(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialEvent {
    Outcome(OutcomeEvent),
    Exposure(ExposureEvent),
}

impl TrialEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Outcome(_) => "outcome",
            Self::Exposure(_) => "exposure",
        }
    }

    pub fn trial_key(&self) -> &str {
        match self {
            Self::Outcome(event) => &event.trial_key,
            Self::Exposure(event) => &event.trial_key,
        }
    }
}

/// Destination for trial events.
///
/// Publishing is fire-and-forget from the dispatcher's side: implementations
/// must not block, and a returned error is logged by the caller and dropped.
#[cfg_attr(test, automock)]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TrialEvent) -> Result<(), TrialError>;
}
