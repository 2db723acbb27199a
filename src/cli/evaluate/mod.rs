//! Evaluate command - runs the stopping rules over a JSON data snapshot

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::config::AutoStopConfig;
use crate::domain::{ExperimentData, StoppingDecision};
use crate::infrastructure::autostop::configured_rules;

#[derive(Args, Clone)]
pub struct EvaluateArgs {
    /// JSON file holding one experiment data snapshot
    pub data: PathBuf,

    /// Minimum samples per variant (overrides config)
    #[arg(long)]
    pub minimum_sample_size: Option<u64>,

    /// Required confidence, e.g. 0.95 (overrides config)
    #[arg(long)]
    pub confidence_level: Option<f64>,

    /// Print the decisions as JSON
    #[arg(long)]
    pub json: bool,
}

impl EvaluateArgs {
    fn thresholds(&self, base: &AutoStopConfig) -> AutoStopConfig {
        AutoStopConfig {
            minimum_sample_size: self.minimum_sample_size.unwrap_or(base.minimum_sample_size),
            confidence_level: self.confidence_level.unwrap_or(base.confidence_level),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RuleDecision {
    pub rule: String,
    #[serde(flatten)]
    pub decision: StoppingDecision,
}

/// Evaluate every built-in rule, in order
pub fn evaluate_data(data: &ExperimentData, thresholds: &AutoStopConfig) -> Vec<RuleDecision> {
    configured_rules(thresholds)
        .iter()
        .map(|rule| RuleDecision {
            rule: rule.name().to_string(),
            decision: rule.evaluate(data),
        })
        .collect()
}

pub async fn run(args: EvaluateArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let raw = tokio::fs::read_to_string(&args.data)
        .await
        .with_context(|| format!("failed to read {}", args.data.display()))?;
    let data: ExperimentData = serde_json::from_str(&raw).context("invalid experiment data")?;

    let thresholds = args.thresholds(&config.autostop);
    info!(
        experiment = %data.experiment_name,
        variants = data.variants.len(),
        minimum_sample_size = thresholds.minimum_sample_size,
        confidence_level = thresholds.confidence_level,
        "Evaluating stopping rules"
    );

    let decisions = evaluate_data(&data, &thresholds);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decisions)?);
        return Ok(());
    }

    for entry in &decisions {
        let verdict = if entry.decision.should_stop { "stop" } else { "continue" };
        println!("{}: {} - {}", entry.rule, verdict, entry.decision.reason);

        if let Some(winner) = &entry.decision.winning_variant {
            println!("  winner: {}", winner);
        }
        if let Some(confidence) = entry.decision.confidence {
            println!("  confidence: {:.4}", confidence);
        }
    }

    Ok(())
}
