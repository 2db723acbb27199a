//! Staged rollout selection mode
//!
//! A plan raises the share of identities sent to the included trial over
//! time. The active stage is the latest one that has started.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::selection::{modes, SelectionContext};
use crate::domain::{
    Clock, IdentityProvider, NamingConvention, SelectionModeProvider, ServiceType, StickyHasher,
    SystemClock, TrialError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutStage {
    pub starts_at: DateTime<Utc>,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutPlan {
    pub included_key: String,
    /// Key for identities outside the rollout; the default trial when absent
    #[serde(default)]
    pub excluded_key: Option<String>,
    #[serde(default)]
    pub stages: Vec<RolloutStage>,
}

impl RolloutPlan {
    pub fn new(included_key: impl Into<String>) -> Self {
        Self {
            included_key: included_key.into(),
            excluded_key: None,
            stages: Vec::new(),
        }
    }

    pub fn with_excluded_key(mut self, key: impl Into<String>) -> Self {
        self.excluded_key = Some(key.into());
        self
    }

    pub fn with_stage(mut self, starts_at: DateTime<Utc>, percentage: u8) -> Self {
        self.stages.push(RolloutStage {
            starts_at,
            percentage,
        });
        self
    }

    /// Percentage of the latest stage started at `now`, 0 before the first
    pub fn percentage_at(&self, now: DateTime<Utc>) -> u8 {
        self.stages
            .iter()
            .filter(|stage| stage.starts_at <= now)
            .max_by_key(|stage| stage.starts_at)
            .map_or(0, |stage| stage.percentage.min(100))
    }
}

pub struct StagedRolloutProvider {
    plans: HashMap<String, RolloutPlan>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
}

impl StagedRolloutProvider {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            plans: HashMap::new(),
            identity,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_plan(mut self, selector_name: impl Into<String>, plan: RolloutPlan) -> Self {
        self.plans.insert(selector_name.into(), plan);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl SelectionModeProvider for StagedRolloutProvider {
    fn mode(&self) -> &str {
        modes::STAGED_ROLLOUT
    }

    async fn select_trial_key(
        &self,
        context: &SelectionContext<'_>,
    ) -> Result<Option<String>, TrialError> {
        let selector = context.selector_name();
        let Some(plan) = self.plans.get(selector) else {
            return Ok(None);
        };

        let percentage = plan.percentage_at(self.clock.now());
        let included = self
            .identity
            .identity(context.scope())
            .is_some_and(|identity| StickyHasher::bucket(&identity, selector) < percentage);

        debug!(selector = %selector, percentage, included, "Staged rollout evaluated");

        if included {
            Ok(Some(plan.included_key.clone()))
        } else {
            Ok(plan.excluded_key.clone())
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
