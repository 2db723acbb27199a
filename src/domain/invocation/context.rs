//! Invocation context seen by decorators

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{CallScope, Invocation};
use crate::domain::ServiceType;

/// Read-only description of one attempt at executing a trial.
///
/// A fresh context is built for every attempt, so replays carry the trial key
/// actually executing and an incremented attempt number.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    invocation_id: Uuid,
    service_type: ServiceType,
    method: String,
    trial_key: String,
    selector_name: String,
    experiment_name: Option<String>,
    attempt: u32,
    arguments: Arc<[Value]>,
    scope: Arc<CallScope>,
    cancellation: CancellationToken,
}

impl InvocationContext {
    pub fn new(
        service_type: ServiceType,
        method: impl Into<String>,
        trial_key: impl Into<String>,
    ) -> Self {
        let selector_name = service_type.short_name().to_string();

        Self {
            invocation_id: Uuid::new_v4(),
            service_type,
            method: method.into(),
            trial_key: trial_key.into(),
            selector_name,
            experiment_name: None,
            attempt: 1,
            arguments: Arc::from(Vec::new()),
            scope: Arc::new(CallScope::default()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Context for an attempt of `invocation` against `trial_key`
    pub fn for_attempt(
        invocation_id: Uuid,
        service_type: ServiceType,
        invocation: &Invocation,
        trial_key: impl Into<String>,
        attempt: u32,
    ) -> Self {
        Self {
            invocation_id,
            service_type,
            method: invocation.method().to_string(),
            trial_key: trial_key.into(),
            selector_name: String::new(),
            experiment_name: None,
            attempt,
            arguments: invocation.arguments().clone(),
            scope: invocation.scope().clone(),
            cancellation: invocation.cancellation().clone(),
        }
    }

    pub fn with_selector_name(mut self, selector_name: impl Into<String>) -> Self {
        self.selector_name = selector_name.into();
        self
    }

    pub fn with_experiment_name(mut self, experiment_name: Option<String>) -> Self {
        self.experiment_name = experiment_name;
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_scope(mut self, scope: CallScope) -> Self {
        self.scope = Arc::new(scope);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Shared by every attempt of one logical call
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn trial_key(&self) -> &str {
        &self.trial_key
    }

    pub fn selector_name(&self) -> &str {
        &self.selector_name
    }

    pub fn experiment_name(&self) -> Option<&str> {
        self.experiment_name.as_deref()
    }

    /// 1 for the primary attempt, 2 and up for replays
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_replay(&self) -> bool {
        self.attempt > 1
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn scope(&self) -> &CallScope {
        &self.scope
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
