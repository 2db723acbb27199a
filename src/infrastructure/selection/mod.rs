//! Built-in selection mode providers

mod configuration;
mod feature_flag;
mod identity;
mod open_feature;
mod rollout;
mod sticky;
mod targeting;

use std::sync::Arc;

pub use configuration::{ConfigurationValueProvider, InMemoryConfigurationSource};
pub use feature_flag::{
    BooleanFeatureFlagProvider, VariantFeatureFlagProvider, DISABLED_KEY, ENABLED_KEY,
};
pub use identity::{AttributeIdentityProvider, ScopeIdentityProvider};
pub use open_feature::OpenFeatureProvider;
pub use rollout::{RolloutPlan, RolloutStage, StagedRolloutProvider};
pub use sticky::StickyRoutingProvider;
pub use targeting::{TargetingProvider, TargetingRule, GROUPS_ATTRIBUTE};

use crate::domain::selection::SelectionModeRegistryBuilder;
use crate::domain::{
    Clock, ConfigurationSource, FlagEvaluator, IdentityProvider, OpenFeatureClient,
    SelectionModeRegistry, SystemClock,
};

/// Collaborators for the built-in modes.
///
/// A mode whose collaborator is missing is not registered, so registrations
/// that use it fail at build time with an unknown selection mode.
pub struct BuiltinModes {
    configuration: Option<Arc<dyn ConfigurationSource>>,
    flags: Option<Arc<dyn FlagEvaluator>>,
    open_feature: Option<Arc<dyn OpenFeatureClient>>,
    identity: Arc<dyn IdentityProvider>,
    targeting: Vec<(String, Vec<TargetingRule>)>,
    rollouts: Vec<(String, RolloutPlan)>,
    clock: Arc<dyn Clock>,
}

impl Default for BuiltinModes {
    fn default() -> Self {
        Self {
            configuration: None,
            flags: None,
            open_feature: None,
            identity: Arc::new(ScopeIdentityProvider),
            targeting: Vec::new(),
            rollouts: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl BuiltinModes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configuration(mut self, source: Arc<dyn ConfigurationSource>) -> Self {
        self.configuration = Some(source);
        self
    }

    pub fn with_flags(mut self, evaluator: Arc<dyn FlagEvaluator>) -> Self {
        self.flags = Some(evaluator);
        self
    }

    pub fn with_open_feature(mut self, client: Arc<dyn OpenFeatureClient>) -> Self {
        self.open_feature = Some(client);
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_targeting(mut self, selector_name: impl Into<String>, rules: Vec<TargetingRule>) -> Self {
        self.targeting.push((selector_name.into(), rules));
        self
    }

    pub fn with_rollout(mut self, selector_name: impl Into<String>, plan: RolloutPlan) -> Self {
        self.rollouts.push((selector_name.into(), plan));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Add the available built-in providers to `builder`
    pub fn register(self, mut builder: SelectionModeRegistryBuilder) -> SelectionModeRegistryBuilder {
        if let Some(source) = self.configuration {
            builder = builder.with_provider(Arc::new(ConfigurationValueProvider::new(source)));
        }

        if let Some(evaluator) = self.flags {
            builder = builder
                .with_provider(Arc::new(BooleanFeatureFlagProvider::new(evaluator.clone())))
                .with_provider(Arc::new(VariantFeatureFlagProvider::new(evaluator)));
        }

        if let Some(client) = self.open_feature {
            builder = builder.with_provider(Arc::new(OpenFeatureProvider::new(client)));
        }

        let targeting = self
            .targeting
            .into_iter()
            .fold(TargetingProvider::new(self.identity.clone()), |provider, (selector, rules)| {
                provider.with_rules(selector, rules)
            });

        let rollout = self
            .rollouts
            .into_iter()
            .fold(
                StagedRolloutProvider::new(self.identity.clone()).with_clock(self.clock),
                |provider, (selector, plan)| provider.with_plan(selector, plan),
            );

        builder
            .with_provider(Arc::new(StickyRoutingProvider::new(self.identity)))
            .with_provider(Arc::new(targeting))
            .with_provider(Arc::new(rollout))
    }

    /// Registry holding only the built-in providers
    pub fn into_registry(self) -> SelectionModeRegistry {
        self.register(SelectionModeRegistry::builder()).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::{modes, MockFlagEvaluator};

    #[test]
    fn test_registers_modes_with_collaborators() {
        let registry = BuiltinModes::new()
            .with_configuration(Arc::new(InMemoryConfigurationSource::new()))
            .with_flags(Arc::new(MockFlagEvaluator::new()))
            .into_registry();

        assert_eq!(
            registry.modes(),
            vec![
                modes::BOOLEAN_FEATURE_FLAG,
                modes::CONFIGURATION_VALUE,
                modes::STAGED_ROLLOUT,
                modes::STICKY_ROUTING,
                modes::TARGETING,
                modes::VARIANT_FEATURE_FLAG,
            ]
        );
        assert!(!registry.contains(modes::OPEN_FEATURE));
    }

    #[test]
    fn test_identity_only_modes_always_present() {
        let registry = BuiltinModes::new().into_registry();

        assert!(registry.contains(modes::STICKY_ROUTING));
        assert!(registry.contains(modes::TARGETING));
        assert!(registry.contains(modes::STAGED_ROLLOUT));
        assert!(registry.resolve(modes::CONFIGURATION_VALUE).is_err());
    }
}
