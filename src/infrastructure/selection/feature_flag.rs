//! Boolean and variant feature flag selection modes

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::selection::{modes, SelectionContext};
use crate::domain::{FlagEvaluator, NamingConvention, SelectionModeProvider, ServiceType, TrialError};

/// Trial key used when the boolean flag is on
pub const ENABLED_KEY: &str = "true";
/// Trial key used when the boolean flag is off
pub const DISABLED_KEY: &str = "false";

/// Maps an on/off flag to the trial keys `"true"` and `"false"`
pub struct BooleanFeatureFlagProvider {
    evaluator: Arc<dyn FlagEvaluator>,
}

impl BooleanFeatureFlagProvider {
    pub fn new(evaluator: Arc<dyn FlagEvaluator>) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl SelectionModeProvider for BooleanFeatureFlagProvider {
    fn mode(&self) -> &str {
        modes::BOOLEAN_FEATURE_FLAG
    }

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError> {
        let flag = context.selector_name();

        match self.evaluator.is_enabled(flag, context.scope()).await {
            Ok(enabled) => Ok(enabled.map(|on| {
                if on { ENABLED_KEY } else { DISABLED_KEY }.to_string()
            })),
            Err(e) => {
                warn!(flag = %flag, error = %e, "Feature flag evaluation failed, using default trial");
                Ok(None)
            }
        }
    }

    fn default_selector_name(
        &self,
        service_type: &ServiceType,
        naming: &dyn NamingConvention,
    ) -> String {
        naming.feature_flag_name(service_type)
    }
}

/// Uses the variant name assigned by a flag as the trial key
pub struct VariantFeatureFlagProvider {
    evaluator: Arc<dyn FlagEvaluator>,
}

impl VariantFeatureFlagProvider {
    pub fn new(evaluator: Arc<dyn FlagEvaluator>) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl SelectionModeProvider for VariantFeatureFlagProvider {
    fn mode(&self) -> &str {
        modes::VARIANT_FEATURE_FLAG
    }

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError> {
        let flag = context.selector_name();

        match self.evaluator.get_variant(flag, context.scope()).await {
            Ok(variant) => Ok(variant.filter(|v| !v.is_empty())),
            Err(e) => {
                warn!(flag = %flag, error = %e, "Variant evaluation failed, using default trial");
                Ok(None)
            }
        }
    }

    fn default_selector_name(
        &self,
        service_type: &ServiceType,
        naming: &dyn NamingConvention,
    ) -> String {
        naming.variant_flag_name(service_type)
    }
}
