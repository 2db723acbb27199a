//! Startup validation of registration batches

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{ConflictType, TrialConflict};
use crate::domain::registration::OnErrorPolicy;
use crate::domain::{ExperimentDefinition, ServiceType, TrialError};

/// Finds conflicts across a batch of experiment definitions.
///
/// Pure: no I/O, inputs are never modified, and every conflict is reported in
/// one pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn detect_conflicts(definitions: &[ExperimentDefinition]) -> Vec<TrialConflict> {
        let mut conflicts = Vec::new();

        let mut groups: IndexMap<&ServiceType, Vec<&ExperimentDefinition>> = IndexMap::new();
        for definition in definitions {
            groups
                .entry(&definition.service_type)
                .or_default()
                .push(definition);
        }

        for (service_type, group) in &groups {
            if group.len() > 1 {
                Self::check_windows(service_type, group, &mut conflicts);
                Self::check_unbounded(service_type, group, &mut conflicts);
            }
            Self::check_allocations(service_type, group, &mut conflicts);
        }

        for definition in definitions {
            Self::check_fallbacks(definition, &mut conflicts);
        }

        debug!(
            registrations = definitions.len(),
            conflicts = conflicts.len(),
            "Conflict detection finished"
        );

        conflicts
    }

    /// Fail with every conflict found, or succeed when there are none
    pub fn validate_or_throw(definitions: &[ExperimentDefinition]) -> Result<(), TrialError> {
        let conflicts = Self::detect_conflicts(definitions);

        if conflicts.is_empty() {
            return Ok(());
        }

        for conflict in &conflicts {
            warn!(conflict = %conflict, "Trial conflict detected");
        }

        Err(TrialError::ConflictsDetected { conflicts })
    }

    fn check_windows(
        service_type: &ServiceType,
        group: &[&ExperimentDefinition],
        conflicts: &mut Vec<TrialConflict>,
    ) {
        for (i, first) in group.iter().enumerate() {
            for second in &group[i + 1..] {
                if !first.overlaps(second) {
                    continue;
                }

                conflicts.push(
                    TrialConflict::new(
                        ConflictType::OverlappingTimeWindows,
                        service_type.as_str(),
                        format!(
                            "'{}' ({}) overlaps '{}' ({})",
                            first.display_name(),
                            describe_window(first),
                            second.display_name(),
                            describe_window(second)
                        ),
                    )
                    .with_experiment_names(names(&[*first, *second])),
                );
            }
        }
    }

    fn check_unbounded(
        service_type: &ServiceType,
        group: &[&ExperimentDefinition],
        conflicts: &mut Vec<TrialConflict>,
    ) {
        let unbounded: Vec<&ExperimentDefinition> = group
            .iter()
            .copied()
            .filter(|definition| definition.is_unbounded())
            .collect();

        if unbounded.len() > 1 {
            conflicts.push(
                TrialConflict::new(
                    ConflictType::DuplicateServiceRegistration,
                    service_type.as_str(),
                    format!(
                        "{} registrations have no time bounds; the active one is ambiguous",
                        unbounded.len()
                    ),
                )
                .with_experiment_names(names(&unbounded)),
            );
        }
    }

    fn check_allocations(
        service_type: &ServiceType,
        group: &[&ExperimentDefinition],
        conflicts: &mut Vec<TrialConflict>,
    ) {
        for definition in group {
            if let Some(percentage) = definition.traffic_percentage.filter(|p| *p > 100) {
                conflicts.push(
                    TrialConflict::new(
                        ConflictType::ExcessivePercentageAllocation,
                        service_type.as_str(),
                        format!(
                            "'{}' allocates {}% of traffic",
                            definition.display_name(),
                            percentage
                        ),
                    )
                    .with_experiment_names(names(&[*definition])),
                );
            }
        }

        for (i, first) in group.iter().enumerate() {
            for second in &group[i + 1..] {
                let (Some(a), Some(b)) = (first.traffic_percentage, second.traffic_percentage)
                else {
                    continue;
                };

                let total = u16::from(a) + u16::from(b);
                if total > 100 && first.overlaps(second) {
                    conflicts.push(
                        TrialConflict::new(
                            ConflictType::ExcessivePercentageAllocation,
                            service_type.as_str(),
                            format!(
                                "'{}' and '{}' together allocate {}% of traffic",
                                first.display_name(),
                                second.display_name(),
                                total
                            ),
                        )
                        .with_experiment_names(names(&[*first, *second])),
                    );
                }
            }
        }
    }

    fn check_fallbacks(definition: &ExperimentDefinition, conflicts: &mut Vec<TrialConflict>) {
        let missing: Vec<&String> = match &definition.on_error {
            OnErrorPolicy::RedirectAndReplay { .. }
            | OnErrorPolicy::RedirectAndReplayOrdered { .. } => definition
                .on_error
                .referenced_keys()
                .iter()
                .filter(|key| !definition.has_trial(key))
                .collect(),
            _ => Vec::new(),
        };

        for key in missing {
            conflicts.push(
                TrialConflict::new(
                    ConflictType::InvalidFallbackKey,
                    definition.service_type.as_str(),
                    format!(
                        "'{}' policy {} references unknown trial '{}'",
                        definition.display_name(),
                        definition.on_error.name(),
                        key
                    ),
                )
                .with_experiment_names(names(&[definition])),
            );
        }
    }
}

fn names(definitions: &[&ExperimentDefinition]) -> Vec<String> {
    definitions
        .iter()
        .filter_map(|definition| definition.experiment_name.clone())
        .collect()
}

fn describe_window(definition: &ExperimentDefinition) -> String {
    let start = definition
        .start_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-inf".to_string());
    let end = definition
        .end_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "+inf".to_string());

    format!("[{}, {})", start, end)
}
