use crate::job::event::IngestionUnit;
use crate::pipeline::UnitError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Outcome indicator of the invoking platform.
///
/// Exactly one of the two methods is called, once, per batch.
pub trait CompletionSignal: Send + Sync {
    fn succeed(&self, units: usize);
    fn fail(&self, unit: &IngestionUnit, error: &UnitError);
}

/// What a batch reported to its invoker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Succeeded { units: usize },
    Failed { container: String, key: String, error: String },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded { .. })
    }
}

/// First-writer-wins wrapper around a `CompletionSignal`.
///
/// The first `try_succeed`/`try_fail` reaches the inner signal; every later
/// call is discarded and reported as `false`.
pub struct OnceSignal {
    decided: AtomicBool,
    inner: Arc<dyn CompletionSignal>,
}

impl OnceSignal {
    pub fn new(inner: Arc<dyn CompletionSignal>) -> Self {
        Self {
            decided: AtomicBool::new(false),
            inner,
        }
    }

    fn claim(&self) -> bool {
        self.decided
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn try_succeed(&self, units: usize) -> bool {
        if !self.claim() {
            return false;
        }
        self.inner.succeed(units);
        true
    }

    pub fn try_fail(&self, unit: &IngestionUnit, error: &UnitError) -> bool {
        if !self.claim() {
            return false;
        }
        self.inner.fail(unit, error);
        true
    }

    pub fn is_decided(&self) -> bool {
        self.decided.load(Ordering::Acquire)
    }
}

/// Signal that hands the outcome to an awaiting task
pub struct ChannelSignal {
    tx: Mutex<Option<oneshot::Sender<BatchOutcome>>>,
}

impl ChannelSignal {
    pub fn new() -> (Self, oneshot::Receiver<BatchOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    fn send(&self, outcome: BatchOutcome) {
        if let Ok(mut guard) = self.tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(outcome);
            }
        }
    }
}

impl CompletionSignal for ChannelSignal {
    fn succeed(&self, units: usize) {
        self.send(BatchOutcome::Succeeded { units });
    }

    fn fail(&self, unit: &IngestionUnit, error: &UnitError) {
        self.send(BatchOutcome::Failed {
            container: unit.container.clone(),
            key: unit.key.clone(),
            error: error.to_string(),
        });
    }
}
