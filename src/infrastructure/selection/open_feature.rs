//! OpenFeature selection mode

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::selection::{modes, SelectionContext};
use crate::domain::{
    NamingConvention, OpenFeatureClient, SelectionModeProvider, ServiceType, TrialError,
};

/// Resolves a string flag, passing the default trial key as the flag default
pub struct OpenFeatureProvider {
    client: Arc<dyn OpenFeatureClient>,
}

impl OpenFeatureProvider {
    pub fn new(client: Arc<dyn OpenFeatureClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SelectionModeProvider for OpenFeatureProvider {
    fn mode(&self) -> &str {
        modes::OPEN_FEATURE
    }

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError> {
        let flag = context.selector_name();

        match self
            .client
            .string_value(flag, context.default_key(), context.scope())
            .await
        {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(flag = %flag, error = %e, "OpenFeature evaluation failed, using default trial");
                Ok(None)
            }
        }
    }

    fn default_selector_name(
        &self,
        service_type: &ServiceType,
        naming: &dyn NamingConvention,
    ) -> String {
        naming.open_feature_flag_name(service_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::MockOpenFeatureClient;
    use crate::domain::{CallScope, DefaultNamingConvention};

    async fn select(client: MockOpenFeatureClient) -> Option<String> {
        let provider = OpenFeatureProvider::new(Arc::new(client));
        let service = ServiceType::new("SearchRanker");
        let keys = vec!["bm25".to_string(), "vector".to_string()];
        let scope = CallScope::new();
        let context = SelectionContext::new(&service, "search-ranker", "bm25", &keys, &scope);

        provider.select_trial_key(&context).await.unwrap()
    }

    #[tokio::test]
    async fn test_passes_default_key_and_returns_value() {
        let mut client = MockOpenFeatureClient::new();
        client
            .expect_string_value()
            .times(1)
            .returning(|flag, default_value, _| {
                assert_eq!(flag, "search-ranker");
                assert_eq!(default_value, "bm25");
                Ok("vector".to_string())
            });

        assert_eq!(select(client).await.as_deref(), Some("vector"));
    }

    #[tokio::test]
    async fn test_failure_means_default() {
        let mut client = MockOpenFeatureClient::new();
        client
            .expect_string_value()
            .returning(|_, _, _| Err(TrialError::selection("open_feature", "provider not ready")));

        assert_eq!(select(client).await, None);
    }

    #[test]
    fn test_default_selector_is_kebab_case() {
        let provider = OpenFeatureProvider::new(Arc::new(MockOpenFeatureClient::new()));

        assert_eq!(
            provider.default_selector_name(&ServiceType::new("SearchRanker"), &DefaultNamingConvention),
            "search-ranker"
        );
    }
}
