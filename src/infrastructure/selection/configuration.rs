//! Configuration-value selection mode

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::selection::{modes, SelectionContext};
use crate::domain::{
    ConfigurationSource, NamingConvention, SelectionModeProvider, ServiceType, TrialError,
};

/// Uses the configured value under the selector name verbatim as the trial key
pub struct ConfigurationValueProvider {
    source: Arc<dyn ConfigurationSource>,
}

impl ConfigurationValueProvider {
    pub fn new(source: Arc<dyn ConfigurationSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SelectionModeProvider for ConfigurationValueProvider {
    fn mode(&self) -> &str {
        modes::CONFIGURATION_VALUE
    }

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError> {
        Ok(self
            .source
            .get(context.selector_name())
            .filter(|value| !value.trim().is_empty()))
    }

    fn default_selector_name(
        &self,
        service_type: &ServiceType,
        naming: &dyn NamingConvention,
    ) -> String {
        naming.configuration_key(service_type)
    }
}

/// Runtime-mutable key-value source
#[derive(Debug, Default)]
pub struct InMemoryConfigurationSource {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryConfigurationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

impl ConfigurationSource for InMemoryConfigurationSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}
