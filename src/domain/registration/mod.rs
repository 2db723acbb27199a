//! Experiment registrations
//!
//! A registration binds a service interface to its candidate implementations
//! (trials), the selection mode that picks between them and the error policy
//! applied when the picked trial fails.

mod entity;
mod policy;

pub use entity::{ExperimentDefinition, ExperimentRegistration, ExperimentRegistrationBuilder};
pub use policy::OnErrorPolicy;
