//! Event sinks

mod channel;
mod collector;
mod fan_out;
mod in_memory;
mod tracing_sink;

pub use channel::ChannelEventSink;
pub use collector::ExperimentDataCollector;
pub use fan_out::FanOutEventSink;
pub use in_memory::InMemoryEventSink;
pub use tracing_sink::{TracingEventSink, TRIAL_EVENTS_TARGET};
