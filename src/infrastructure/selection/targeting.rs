//! Targeting selection mode
//!
//! Each selector has an ordered list of rules; the first rule matching the
//! caller decides the trial key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::selection::{modes, SelectionContext};
use crate::domain::{
    CallScope, IdentityProvider, NamingConvention, SelectionModeProvider, ServiceType,
    StickyHasher, TrialError,
};

/// Scope attribute holding the caller's comma separated groups
pub const GROUPS_ATTRIBUTE: &str = "groups";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingRule {
    pub trial_key: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Share of remaining identities sent to `trial_key`, 0-100
    #[serde(default)]
    pub percentage: Option<u8>,
}

impl TargetingRule {
    pub fn new(trial_key: impl Into<String>) -> Self {
        Self {
            trial_key: trial_key.into(),
            ..Default::default()
        }
    }

    pub fn with_users(mut self, users: &[&str]) -> Self {
        self.users = users.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_percentage(mut self, percentage: u8) -> Self {
        self.percentage = Some(percentage);
        self
    }

    fn matches(&self, selector_name: &str, identity: Option<&str>, groups: &[&str]) -> bool {
        if let Some(identity) = identity {
            if self.users.iter().any(|user| user == identity) {
                return true;
            }
        }

        if self.groups.iter().any(|group| groups.contains(&group.as_str())) {
            return true;
        }

        match (self.percentage, identity) {
            (Some(percentage), Some(identity)) => {
                let salt = format!("{}:{}", selector_name, self.trial_key);
                StickyHasher::bucket(identity, &salt) < percentage
            }
            _ => false,
        }
    }
}

pub struct TargetingProvider {
    rules: HashMap<String, Vec<TargetingRule>>,
    identity: Arc<dyn IdentityProvider>,
}

impl TargetingProvider {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            rules: HashMap::new(),
            identity,
        }
    }

    /// Set the rules of one selector, replacing earlier ones
    pub fn with_rules(mut self, selector_name: impl Into<String>, rules: Vec<TargetingRule>) -> Self {
        self.rules.insert(selector_name.into(), rules);
        self
    }

    fn groups(scope: &CallScope) -> Vec<&str> {
        scope
            .attribute(GROUPS_ATTRIBUTE)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|group| !group.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SelectionModeProvider for TargetingProvider {
    fn mode(&self) -> &str {
        modes::TARGETING
    }

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError> {
        let Some(rules) = self.rules.get(context.selector_name()) else {
            return Ok(None);
        };

        let identity = self.identity.identity(context.scope());
        let groups = Self::groups(context.scope());

        Ok(rules
            .iter()
            .find(|rule| rule.matches(context.selector_name(), identity.as_deref(), &groups))
            .map(|rule| rule.trial_key.clone()))
    }

    fn default_selector_name(
        &self,
        service_type: &ServiceType,
        naming: &dyn NamingConvention,
    ) -> String {
        naming.variant_flag_name(service_type)
    }
}
