//! Domain layer - experiment registration, selection and dispatch

pub mod autostop;
pub mod clock;
pub mod conflict;
pub mod error;
pub mod events;
pub mod invocation;
pub mod naming;
pub mod registration;
pub mod selection;
pub mod service;

pub use autostop::{ExperimentData, StoppingDecision, StoppingRule, VariantData};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::{ConflictDetector, ConflictType, TrialConflict};
pub use error::TrialError;
pub use events::{EventSink, ExposureEvent, OutcomeEvent, TrialEvent};
pub use invocation::{
    downcast_output, CallScope, DecoratorChain, DecoratorFactory, Dispatcher, DispatcherBuilder,
    Invocation, InvocationContext, Next, Terminal, TrialDecorator, TrialOutput, TrialResult,
};
pub use naming::{DefaultNamingConvention, NamingConvention};
pub use registration::{
    ExperimentDefinition, ExperimentRegistration, ExperimentRegistrationBuilder, OnErrorPolicy,
};
pub use selection::{
    ConfigurationSource, FlagEvaluator, IdentityProvider, OpenFeatureClient, SelectionContext,
    SelectionModeProvider, SelectionModeRegistry, StickyHasher,
};
pub use service::ServiceType;

#[cfg(test)]
pub use events::MockEventSink;
