//! Validate command - checks a TOML file of experiment definitions

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ConflictDetector, ExperimentDefinition, TrialConflict};

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// TOML file with `[[experiments]]` tables
    pub definitions: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    #[serde(default)]
    experiments: Vec<ExperimentDefinition>,
}

/// Problems found in a batch of definitions
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub experiments: usize,
    /// Definitions that break their own invariants
    pub invalid: Vec<String>,
    pub conflicts: Vec<TrialConflict>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.conflicts.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.invalid.len() + self.conflicts.len()
    }
}

/// Parse definitions from TOML
pub fn parse_definitions(raw: &str) -> anyhow::Result<Vec<ExperimentDefinition>> {
    let file: DefinitionsFile = toml::from_str(raw).context("invalid definitions file")?;
    Ok(file.experiments)
}

/// Check each definition, then the batch as a whole
pub fn validate_definitions(definitions: &[ExperimentDefinition]) -> ValidationReport {
    let invalid = definitions
        .iter()
        .filter_map(|definition| {
            definition
                .validate()
                .err()
                .map(|e| format!("{}: {}", definition.display_name(), e))
        })
        .collect();

    ValidationReport {
        experiments: definitions.len(),
        invalid,
        conflicts: ConflictDetector::detect_conflicts(definitions),
    }
}

pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    super::bootstrap()?;

    let raw = tokio::fs::read_to_string(&args.definitions)
        .await
        .with_context(|| format!("failed to read {}", args.definitions.display()))?;
    let definitions = parse_definitions(&raw)?;

    info!(count = definitions.len(), "Validating experiment definitions");
    let report = validate_definitions(&definitions);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in &report.invalid {
            println!("invalid: {}", line);
        }
        for conflict in &report.conflicts {
            println!("conflict: {}", conflict);
        }
        println!(
            "{} experiment(s) checked, {} issue(s) found",
            report.experiments,
            report.issue_count()
        );
    }

    if !report.is_clean() {
        anyhow::bail!("{} issue(s) found", report.issue_count());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConflictType;

    const DEFINITIONS: &str = r#"
        [[experiments]]
        service_type = "app::PaymentService"
        experiment_name = "psp-spring"
        default_trial_key = "stripe"
        trial_keys = ["stripe", "adyen"]
        start_time = "2026-03-01T00:00:00Z"
        end_time = "2026-04-01T00:00:00Z"

        [[experiments]]
        service_type = "app::PaymentService"
        experiment_name = "psp-march"
        default_trial_key = "stripe"
        trial_keys = ["stripe", "braintree"]
        start_time = "2026-03-15T00:00:00Z"
        end_time = "2026-05-01T00:00:00Z"
        on_error = { type = "redirect_and_replay", fallback_key = "paypal" }

        [[experiments]]
        service_type = "app::Search"
        default_trial_key = "bm25"
        trial_keys = ["vector"]
    "#;

    #[test]
    fn test_reports_every_problem() {
        let definitions = parse_definitions(DEFINITIONS).unwrap();
        let report = validate_definitions(&definitions);

        assert_eq!(report.experiments, 3);
        assert_eq!(report.invalid.len(), 1);
        assert!(report.invalid[0].starts_with("app::Search: "));
        assert!(report.invalid[0].contains("bm25"));

        let types: Vec<ConflictType> = report.conflicts.iter().map(|c| c.conflict_type).collect();
        assert!(types.contains(&ConflictType::OverlappingTimeWindows));
        assert!(types.contains(&ConflictType::InvalidFallbackKey));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_clean_file() {
        let definitions = parse_definitions(
            r#"
            [[experiments]]
            service_type = "app::Search"
            selection_mode = "sticky_routing"
            default_trial_key = "bm25"
            trial_keys = ["bm25", "vector"]
            "#,
        )
        .unwrap();

        let report = validate_definitions(&definitions);

        assert!(report.is_clean());
        assert_eq!(report.issue_count(), 0);
    }

    #[test]
    fn test_duplicate_trial_keys_are_invalid() {
        let definitions = parse_definitions(
            r#"
            [[experiments]]
            service_type = "app::Search"
            default_trial_key = "a"
            trial_keys = ["a", "a"]
            "#,
        )
        .unwrap();

        let report = validate_definitions(&definitions);

        assert_eq!(report.invalid.len(), 1);
        assert!(report.invalid[0].contains("more than once"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(parse_definitions("[[experiments]]\nservice_type = 3").is_err());
    }
}
