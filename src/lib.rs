//! PMP Trials
//!
//! In-process experimentation for service interfaces:
//! - Selection modes choosing a trial per call (configuration, feature flags,
//!   OpenFeature, sticky routing, targeting, staged rollouts)
//! - A dispatcher running the chosen trial inside a decorator chain, with
//!   replay policies when a trial fails
//! - Conflict detection over experiment registrations
//! - Stopping rules over aggregated outcomes

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::{DispatcherBuilder, Dispatcher, EventSink, SelectionModeRegistry};
use infrastructure::decorators::standard_decorators;

/// Dispatcher builder carrying the standard decorators described by `config`
pub fn create_dispatcher_builder(
    config: &AppConfig,
    selection_modes: SelectionModeRegistry,
    sink: Option<Arc<dyn EventSink>>,
) -> DispatcherBuilder {
    standard_decorators(&config.dispatch, sink)
        .into_iter()
        .fold(Dispatcher::builder(selection_modes), |builder, factory| {
            builder.with_decorator(factory)
        })
}
