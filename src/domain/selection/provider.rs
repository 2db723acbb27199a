//! Selection mode provider contract and registry

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::SelectionContext;
use crate::domain::{NamingConvention, ServiceType, TrialError};

/// A pluggable strategy that picks a trial key for a call.
///
/// Returning `Ok(None)` means "use the default trial". Well-behaved providers
/// turn their own collaborator failures into `Ok(None)`; an `Err` is treated by
/// the dispatcher as a failed attempt and handed to the error policy.
#[async_trait]
pub trait SelectionModeProvider: Send + Sync {
    /// Identifier this provider is registered under
    fn mode(&self) -> &str;

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError>;

    /// Selector name used when a registration does not set one
    fn default_selector_name(
        &self,
        service_type: &ServiceType,
        naming: &dyn NamingConvention,
    ) -> String;
}

/// Immutable mapping from mode identifier to provider
#[derive(Clone, Default)]
pub struct SelectionModeRegistry {
    providers: HashMap<String, Arc<dyn SelectionModeProvider>>,
}

impl SelectionModeRegistry {
    pub fn builder() -> SelectionModeRegistryBuilder {
        SelectionModeRegistryBuilder::default()
    }

    /// Provider registered for `mode`
    pub fn resolve(&self, mode: &str) -> Result<Arc<dyn SelectionModeProvider>, TrialError> {
        self.providers
            .get(mode)
            .cloned()
            .ok_or_else(|| TrialError::unknown_mode(mode))
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.providers.contains_key(mode)
    }

    /// Registered mode identifiers, sorted
    pub fn modes(&self) -> Vec<&str> {
        let mut modes: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        modes.sort_unstable();
        modes
    }
}

impl fmt::Debug for SelectionModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionModeRegistry")
            .field("modes", &self.modes())
            .finish()
    }
}

/// Builder for [`SelectionModeRegistry`]
#[derive(Default)]
pub struct SelectionModeRegistryBuilder {
    providers: HashMap<String, Arc<dyn SelectionModeProvider>>,
}

impl SelectionModeRegistryBuilder {
    /// Register a provider under its own mode identifier
    pub fn with_provider(self, provider: Arc<dyn SelectionModeProvider>) -> Self {
        let mode = provider.mode().to_string();
        self.with_mode(mode, provider)
    }

    /// Register a provider under an explicit identifier, replacing any previous one
    pub fn with_mode(
        mut self,
        mode: impl Into<String>,
        provider: Arc<dyn SelectionModeProvider>,
    ) -> Self {
        let mode = mode.into();

        if self.providers.insert(mode.clone(), provider).is_some() {
            debug!(mode = %mode, "Replacing selection mode provider");
        }
        self
    }

    pub fn build(self) -> SelectionModeRegistry {
        SelectionModeRegistry {
            providers: self.providers,
        }
    }
}
