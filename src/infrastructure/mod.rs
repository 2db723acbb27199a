//! Infrastructure layer - built-in providers, decorators, sinks and rules

pub mod autostop;
pub mod decorators;
pub mod events;
pub mod logging;
pub mod observability;
pub mod selection;
