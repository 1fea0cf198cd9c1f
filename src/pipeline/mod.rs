pub mod backpressure;
pub mod runner;
pub mod tracker;

pub use backpressure::SubmissionGate;
pub use runner::{UnitError, UnitPipeline, UnitReport};
pub use tracker::{CompletionTracker, TrackerState};
