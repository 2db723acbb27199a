//! Naming conventions for selector names

use heck::{ToKebabCase, ToSnakeCase};

use super::ServiceType;

/// Derives default selector names (flag names, configuration keys) from a service type
pub trait NamingConvention: Send + Sync + std::fmt::Debug {
    /// Flag name used by the boolean feature flag mode
    fn feature_flag_name(&self, service_type: &ServiceType) -> String;

    /// Flag name used by the variant feature flag, sticky routing, targeting and rollout modes
    fn variant_flag_name(&self, service_type: &ServiceType) -> String;

    /// Configuration key used by the configuration value mode
    fn configuration_key(&self, service_type: &ServiceType) -> String;

    /// Flag name used by the OpenFeature mode
    fn open_feature_flag_name(&self, service_type: &ServiceType) -> String;
}

/// Default naming convention
///
/// - feature and variant flags use the short type name verbatim (`PaymentService`)
/// - configuration keys live under `experiments.` in snake case (`experiments.payment_service`)
/// - OpenFeature flags are kebab case (`payment-service`)
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNamingConvention;

impl NamingConvention for DefaultNamingConvention {
    fn feature_flag_name(&self, service_type: &ServiceType) -> String {
        service_type.short_name().to_string()
    }

    fn variant_flag_name(&self, service_type: &ServiceType) -> String {
        service_type.short_name().to_string()
    }

    fn configuration_key(&self, service_type: &ServiceType) -> String {
        format!("experiments.{}", service_type.short_name().to_snake_case())
    }

    fn open_feature_flag_name(&self, service_type: &ServiceType) -> String {
        service_type.short_name().to_kebab_case()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let naming = DefaultNamingConvention;
        let service = ServiceType::new("billing::PaymentService");

        assert_eq!(naming.feature_flag_name(&service), "PaymentService");
        assert_eq!(naming.variant_flag_name(&service), "PaymentService");
        assert_eq!(
            naming.configuration_key(&service),
            "experiments.payment_service"
        );
        assert_eq!(naming.open_feature_flag_name(&service), "payment-service");
    }
}
