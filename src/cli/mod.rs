//! CLI for trial tooling
//!
//! - `validate`: check experiment definitions for conflicts
//! - `evaluate`: run the stopping rules over collected experiment data

pub mod evaluate;
pub mod validate;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// PMP Trials - in-process experiment tooling
#[derive(Parser)]
#[command(name = "pmp-trials")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate experiment definitions and report every conflict
    Validate(validate::ValidateArgs),

    /// Evaluate stopping rules against an experiment data snapshot
    Evaluate(evaluate::EvaluateArgs),
}

/// Load configuration and install logging, shared by every command
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging)?;

    Ok(config)
}
