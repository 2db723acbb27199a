//! Trial selection
//!
//! Selection modes map a call to a trial key. Each mode is a
//! [`SelectionModeProvider`] registered under a string identifier in a
//! [`SelectionModeRegistry`]; the built-in identifiers are listed in [`modes`].

mod context;
mod hashing;
mod provider;
mod sources;

pub use context::SelectionContext;
pub use hashing::StickyHasher;
pub use provider::{SelectionModeProvider, SelectionModeRegistry, SelectionModeRegistryBuilder};
pub use sources::{ConfigurationSource, FlagEvaluator, IdentityProvider, OpenFeatureClient};

#[cfg(test)]
pub use sources::{MockConfigurationSource, MockFlagEvaluator, MockOpenFeatureClient};

/// Identifiers of the built-in selection modes
pub mod modes {
    pub const CONFIGURATION_VALUE: &str = "configuration_value";
    pub const BOOLEAN_FEATURE_FLAG: &str = "boolean_feature_flag";
    pub const VARIANT_FEATURE_FLAG: &str = "variant_feature_flag";
    pub const OPEN_FEATURE: &str = "open_feature";
    pub const STICKY_ROUTING: &str = "sticky_routing";
    pub const TARGETING: &str = "targeting";
    pub const STAGED_ROLLOUT: &str = "staged_rollout";
}
