//! Sticky routing selection mode

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::selection::{modes, SelectionContext};
use crate::domain::{
    IdentityProvider, NamingConvention, SelectionModeProvider, ServiceType, StickyHasher,
    TrialError,
};

/// Hashes the caller identity onto one of the trial keys.
///
/// The result only depends on identity, selector name and the set of keys,
/// so it survives restarts and registration reordering.
pub struct StickyRoutingProvider {
    identity: Arc<dyn IdentityProvider>,
}

impl StickyRoutingProvider {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl SelectionModeProvider for StickyRoutingProvider {
    fn mode(&self) -> &str {
        modes::STICKY_ROUTING
    }

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError> {
        let Some(identity) = self.identity.identity(context.scope()) else {
            debug!(selector = %context.selector_name(), "No identity for sticky routing");
            return Ok(None);
        };

        Ok(StickyHasher::pick(&identity, context.selector_name(), context.trial_keys())
            .map(str::to_string))
    }

    fn default_selector_name(
        &self,
        service_type: &ServiceType,
        naming: &dyn NamingConvention,
    ) -> String {
        naming.variant_flag_name(service_type)
    }
}
