use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Optional limit on concurrently in-flight document submissions.
///
/// Unbounded by default: every submission is issued as soon as its line is
/// parsed. With a limit, submissions beyond it wait for a permit inside their
/// own task, so line production is never slowed down.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGate {
    permits: Option<Arc<Semaphore>>,
}

impl SubmissionGate {
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            permits: max_in_flight.map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
        }
    }

    pub fn unbounded() -> Self {
        Self { permits: None }
    }

    pub fn is_bounded(&self) -> bool {
        self.permits.is_some()
    }

    /// Wait for a slot. The returned guard releases it on drop.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.permits {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    /// Currently free slots, `None` when unbounded
    pub fn available(&self) -> Option<usize> {
        self.permits.as_ref().map(|s| s.available_permits())
    }
}
