use thiserror::Error;

use super::conflict::TrialConflict;

/// Core trial dispatch errors
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("No registration found for service '{service_type}'")]
    NoRegistrationFound { service_type: String },

    #[error("Unknown selection mode: '{mode}'")]
    UnknownSelectionMode { mode: String },

    #[error("Invalid registration: {message}")]
    InvalidRegistration { message: String },

    #[error("{} trial conflict(s) detected: {}", .conflicts.len(), summarize(.conflicts))]
    ConflictsDetected { conflicts: Vec<TrialConflict> },

    #[error("Selection error: {mode} - {message}")]
    Selection { mode: String, message: String },

    #[error("Trial failed: {message}")]
    Failed { message: String },

    /// Raised by the timeout decorator when a trial exceeds its limit.
    #[error(
        "Trial '{trial_key}' of '{service_type}::{method}' timed out after {elapsed_ms}ms (limit {limit_ms}ms)"
    )]
    Timeout {
        service_type: String,
        method: String,
        trial_key: String,
        elapsed_ms: u64,
        limit_ms: u64,
    },

    /// Raised by the circuit breaker decorator while the circuit is open.
    #[error("Circuit open for trial '{trial_key}' of '{service_type}::{method}'")]
    CircuitOpen {
        service_type: String,
        method: String,
        trial_key: String,
    },

    #[error("Invocation cancelled")]
    Cancelled,

    #[error("Publish error: {message}")]
    Publish { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn summarize(conflicts: &[TrialConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TrialError {
    pub fn no_registration(service_type: impl Into<String>) -> Self {
        Self::NoRegistrationFound {
            service_type: service_type.into(),
        }
    }

    pub fn unknown_mode(mode: impl Into<String>) -> Self {
        Self::UnknownSelectionMode { mode: mode.into() }
    }

    pub fn invalid_registration(message: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            message: message.into(),
        }
    }

    pub fn selection(mode: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Selection {
            mode: mode.into(),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means the caller gave up on the invocation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
