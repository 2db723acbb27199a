//! Identity providers over the call scope

use crate::domain::{CallScope, IdentityProvider};

/// Identity carried explicitly by the call scope
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeIdentityProvider;

impl IdentityProvider for ScopeIdentityProvider {
    fn identity(&self, scope: &CallScope) -> Option<String> {
        scope
            .identity()
            .filter(|identity| !identity.is_empty())
            .map(str::to_string)
    }
}

/// Identity read from a named scope attribute, e.g. `tenant_id`
#[derive(Debug, Clone)]
pub struct AttributeIdentityProvider {
    attribute: String,
}

impl AttributeIdentityProvider {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl IdentityProvider for AttributeIdentityProvider {
    fn identity(&self, scope: &CallScope) -> Option<String> {
        scope
            .attribute(&self.attribute)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_identity() {
        let provider = ScopeIdentityProvider;

        assert_eq!(
            provider.identity(&CallScope::new().with_identity("u1")).as_deref(),
            Some("u1")
        );
        assert_eq!(provider.identity(&CallScope::new().with_identity("")), None);
        assert_eq!(provider.identity(&CallScope::new()), None);
    }

    #[test]
    fn test_attribute_identity() {
        let provider = AttributeIdentityProvider::new("tenant_id");
        let scope = CallScope::new()
            .with_identity("user")
            .with_attribute("tenant_id", "acme");

        assert_eq!(provider.identity(&scope).as_deref(), Some("acme"));
        assert_eq!(provider.identity(&CallScope::new().with_identity("user")), None);
    }
}
