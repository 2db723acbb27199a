//! Invocation pipeline
//!
//! Per-call types ([`Invocation`], [`InvocationContext`]), the decorator chain
//! and the [`Dispatcher`] that ties selection, decorators and error policies
//! together.

mod context;
mod decorator;
mod dispatcher;
mod scope;

pub use context::InvocationContext;
pub use decorator::{
    downcast_output, DecoratorChain, DecoratorFactory, Next, Terminal, TrialDecorator,
    TrialOutput, TrialResult,
};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use scope::{CallScope, Invocation};
