//! Trial conflict detection

mod detector;
mod entity;

pub use detector::ConflictDetector;
pub use entity::{ConflictType, TrialConflict};
