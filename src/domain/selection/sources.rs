//! External collaborators consulted by selection modes

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::invocation::CallScope;
use crate::domain::TrialError;

/// Key-value configuration lookup
#[cfg_attr(test, automock)]
pub trait ConfigurationSource: Send + Sync {
    /// Value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;
}

/// Resolves the identity of the caller for a call scope
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    fn identity(&self, scope: &CallScope) -> Option<String>;
}

/// Feature flag and variant evaluator
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FlagEvaluator: Send + Sync {
    /// Whether the boolean flag is on; `None` when the flag is unknown
    async fn is_enabled(&self, flag: &str, scope: &CallScope) -> Result<Option<bool>, TrialError>;

    /// Variant assigned by the flag; `None` when the flag is unknown
    async fn get_variant(&self, flag: &str, scope: &CallScope)
        -> Result<Option<String>, TrialError>;
}

/// String flag resolution in the OpenFeature style: the client always answers,
/// falling back to the supplied default.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OpenFeatureClient: Send + Sync {
    async fn string_value(
        &self,
        flag: &str,
        default_value: &str,
        scope: &CallScope,
    ) -> Result<String, TrialError>;
}
