//! Trial conflict records

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of problem found in a batch of registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Two registrations of one service are active at the same time
    OverlappingTimeWindows,
    /// Traffic allocations add up to more than 100 percent
    ExcessivePercentageAllocation,
    /// More than one registration of a service has no time bounds
    DuplicateServiceRegistration,
    /// An error policy names a trial that is not registered
    InvalidFallbackKey,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverlappingTimeWindows => write!(f, "overlapping_time_windows"),
            Self::ExcessivePercentageAllocation => write!(f, "excessive_percentage_allocation"),
            Self::DuplicateServiceRegistration => write!(f, "duplicate_service_registration"),
            Self::InvalidFallbackKey => write!(f, "invalid_fallback_key"),
        }
    }
}

/// One conflict found by the detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialConflict {
    pub conflict_type: ConflictType,
    pub service_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiment_names: Vec<String>,
}

impl TrialConflict {
    pub fn new(
        conflict_type: ConflictType,
        service_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conflict_type,
            service_type: service_type.into(),
            description: description.into(),
            experiment_names: Vec::new(),
        }
    }

    pub fn with_experiment_names(mut self, names: Vec<String>) -> Self {
        self.experiment_names = names;
        self
    }
}

impl fmt::Display for TrialConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.conflict_type, self.service_type, self.description
        )
    }
}
