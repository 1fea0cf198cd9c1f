use crate::index::IndexError;
use crate::pipeline::UnitError;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Running,
    Succeeded,
    Failed,
}

impl TrackerState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrackerState::Running)
    }
}

/// Decides the outcome of one ingestion unit by counting.
///
/// Lines produced and documents acknowledged arrive independently and in any
/// order. The unit succeeds once production is complete and every produced
/// line is acknowledged, and fails on the first error. Both terminal states
/// absorb every later event.
///
/// Each event method returns the terminal state it caused, if any, so the
/// caller reacts to a transition exactly once.
#[derive(Debug)]
pub struct CompletionTracker {
    lines_seen: u64,
    docs_acknowledged: u64,
    production_done: bool,
    state: TrackerState,
    failure: Option<UnitError>,
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self {
            lines_seen: 0,
            docs_acknowledged: 0,
            production_done: false,
            state: TrackerState::Running,
            failure: None,
        }
    }

    pub fn on_line_produced(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.lines_seen += 1;
    }

    /// No more lines will be produced
    pub fn on_line_source_done(&mut self) -> Option<TrackerState> {
        if self.state.is_terminal() {
            return None;
        }
        self.production_done = true;
        self.check_converged()
    }

    /// Terminal failure before a document was submitted (read, decompression
    /// or parse errors)
    pub fn on_line_source_error(&mut self, error: UnitError) -> Option<TrackerState> {
        self.fail(error)
    }

    pub fn on_document_acknowledged(
        &mut self,
        result: Result<(), IndexError>,
    ) -> Option<TrackerState> {
        if self.state.is_terminal() {
            return None;
        }

        match result {
            Ok(()) => {
                if self.docs_acknowledged >= self.lines_seen {
                    warn!(
                        lines = self.lines_seen,
                        docs = self.docs_acknowledged,
                        "Ignoring acknowledgment without a matching line"
                    );
                    return None;
                }
                self.docs_acknowledged += 1;
                self.check_converged()
            }
            Err(e) => self.fail(UnitError::Indexing(e)),
        }
    }

    fn fail(&mut self, error: UnitError) -> Option<TrackerState> {
        if self.state.is_terminal() {
            return None;
        }
        self.state = TrackerState::Failed;
        self.failure = Some(error);
        Some(TrackerState::Failed)
    }

    fn check_converged(&mut self) -> Option<TrackerState> {
        if self.production_done && self.docs_acknowledged == self.lines_seen {
            self.state = TrackerState::Succeeded;
            return Some(TrackerState::Succeeded);
        }
        None
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    pub fn docs_acknowledged(&self) -> u64 {
        self.docs_acknowledged
    }

    /// Documents submitted but not yet acknowledged
    pub fn outstanding(&self) -> u64 {
        self.lines_seen - self.docs_acknowledged
    }

    pub fn is_production_done(&self) -> bool {
        self.production_done
    }

    pub fn failure(&self) -> Option<&UnitError> {
        self.failure.as_ref()
    }

    /// Take the recorded failure, leaving the state untouched
    pub fn take_failure(&mut self) -> Option<UnitError> {
        self.failure.take()
    }
}
