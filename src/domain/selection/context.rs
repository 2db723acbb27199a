//! Selection context handed to selection mode providers

use crate::domain::ServiceType;
use crate::domain::invocation::CallScope;

/// Everything a provider may look at to pick a trial. Lives for one selection.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    service_type: &'a ServiceType,
    selector_name: &'a str,
    default_key: &'a str,
    trial_keys: &'a [String],
    scope: &'a CallScope,
}

impl<'a> SelectionContext<'a> {
    pub fn new(
        service_type: &'a ServiceType,
        selector_name: &'a str,
        default_key: &'a str,
        trial_keys: &'a [String],
        scope: &'a CallScope,
    ) -> Self {
        Self {
            service_type,
            selector_name,
            default_key,
            trial_keys,
            scope,
        }
    }

    pub fn service_type(&self) -> &'a ServiceType {
        self.service_type
    }

    pub fn selector_name(&self) -> &'a str {
        self.selector_name
    }

    pub fn default_key(&self) -> &'a str {
        self.default_key
    }

    pub fn trial_keys(&self) -> &'a [String] {
        self.trial_keys
    }

    pub fn scope(&self) -> &'a CallScope {
        self.scope
    }

    pub fn has_trial(&self, key: &str) -> bool {
        self.trial_keys.iter().any(|k| k == key)
    }
}
