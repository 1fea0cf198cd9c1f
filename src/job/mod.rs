pub mod event;
pub mod orchestrator;
pub mod signal;

pub use event::{EventError, IngestionUnit, TriggerEvent};
pub use orchestrator::{BatchHandle, BatchJob, Orchestrator};
pub use signal::{BatchOutcome, ChannelSignal, CompletionSignal, OnceSignal};
