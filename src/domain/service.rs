//! Service type identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an experimented service interface.
///
/// The full path is the identity; the short name (last path segment) is what
/// naming conventions derive selector names from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceType(String);

impl ServiceType {
    /// Create a service type from an explicit name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive the service type of `T`, usually a trait object such as `dyn PaymentService`
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<T>();
        Self(name.strip_prefix("dyn ").unwrap_or(name).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, ignoring generic arguments and trait object bounds
    pub fn short_name(&self) -> &str {
        let base = self.0.split(['<', ' ']).next().unwrap_or(&self.0);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServiceType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait PaymentService {}

    #[test]
    fn test_of_trait_object() {
        let service = ServiceType::of::<dyn PaymentService>();

        assert!(service.as_str().ends_with("PaymentService"));
        assert!(!service.as_str().starts_with("dyn "));
        assert_eq!(service.short_name(), "PaymentService");
    }

    #[test]
    fn test_of_trait_object_with_bounds() {
        let service = ServiceType::of::<dyn PaymentService + Send + Sync>();
        assert_eq!(service.short_name(), "PaymentService");
    }

    #[test]
    fn test_short_name_of_plain_name() {
        assert_eq!(ServiceType::new("Checkout").short_name(), "Checkout");
        assert_eq!(ServiceType::new("a::b::Checkout").short_name(), "Checkout");
    }

    #[test]
    fn test_identity_uses_full_path() {
        assert_ne!(ServiceType::new("a::Checkout"), ServiceType::new("b::Checkout"));
    }
}
