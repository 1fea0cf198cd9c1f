use crate::index::{DocumentPublisher, IndexError};
use crate::job::event::IngestionUnit;
use crate::pipeline::tracker::{CompletionTracker, TrackerState};
use crate::source::reader::{LineSource, LineSourceError, DEFAULT_MAX_LINE_BYTES};
use crate::source::record::{ParseError, RecordParser};
use crate::storage::{ObjectStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Reasons a single ingestion unit fails
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("retrieval error: {0}")]
    Retrieval(#[from] StoreError),

    #[error("line source error: {0}")]
    LineSource(#[from] LineSourceError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("indexing error: {0}")]
    Indexing(#[from] IndexError),

    #[error("{outstanding} document acknowledgments were never delivered")]
    AcknowledgmentLost { outstanding: u64 },

    #[error("unit task ended abnormally: {0}")]
    Aborted(String),
}

/// Final accounting of one unit
#[derive(Debug)]
pub struct UnitReport {
    pub unit: IngestionUnit,
    pub lines_seen: u64,
    pub docs_acknowledged: u64,
    pub outcome: Result<(), UnitError>,
}

impl UnitReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Everything needed to run the pipeline for one object
#[derive(Clone)]
pub struct UnitPipeline {
    store: Arc<dyn ObjectStore>,
    parser: Arc<RecordParser>,
    publisher: DocumentPublisher,
    line_buffer: usize,
    max_line_bytes: usize,
}

impl UnitPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        parser: Arc<RecordParser>,
        publisher: DocumentPublisher,
        line_buffer: usize,
    ) -> Self {
        Self {
            store,
            parser,
            publisher,
            line_buffer,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Fail a unit on the first line longer than `max_line_bytes`
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Retrieve, decompress, parse and publish one object.
    ///
    /// Returns once the unit's tracker is terminal. Submissions still in
    /// flight after a failure are left to finish on their own.
    pub async fn run(&self, unit: IngestionUnit) -> UnitReport {
        let mut tracker = CompletionTracker::new();
        debug!(container = %unit.container, key = %unit.key, "Starting unit pipeline");

        match self.store.get_object(&unit.container, &unit.key).await {
            Ok(reader) => {
                let lines =
                    LineSource::spawn_with_limit(reader, self.line_buffer, self.max_line_bytes);
                self.drive(lines, &mut tracker).await;
            }
            Err(e) => {
                tracker.on_line_source_error(UnitError::Retrieval(e));
            }
        }

        let outcome = match tracker.state() {
            TrackerState::Succeeded => Ok(()),
            _ => Err(tracker.take_failure().unwrap_or_else(|| {
                UnitError::Aborted("tracker stopped without outcome".to_string())
            })),
        };

        match &outcome {
            Ok(()) => info!(
                container = %unit.container,
                key = %unit.key,
                docs = tracker.docs_acknowledged(),
                "Log records added to index"
            ),
            Err(e) => error!(
                container = %unit.container,
                key = %unit.key,
                docs = tracker.docs_acknowledged(),
                lines = tracker.lines_seen(),
                error = %e,
                "Unit failed"
            ),
        }

        UnitReport {
            unit,
            lines_seen: tracker.lines_seen(),
            docs_acknowledged: tracker.docs_acknowledged(),
            outcome,
        }
    }

    async fn drive(&self, mut lines: LineSource, tracker: &mut CompletionTracker) {
        let (ack_tx, mut ack_rx) = mpsc::unbounded_channel::<Result<(), IndexError>>();
        // Dropped once the line source is exhausted so a lost acknowledgment
        // shows up as a closed channel instead of a hang.
        let mut ack_tx = Some(ack_tx);

        while !tracker.state().is_terminal() {
            tokio::select! {
                biased;

                ack = ack_rx.recv() => match ack {
                    Some(result) => {
                        tracker.on_document_acknowledged(result);
                    }
                    None => {
                        let outstanding = tracker.outstanding();
                        tracker.on_line_source_error(UnitError::AcknowledgmentLost { outstanding });
                    }
                },

                line = lines.next_line(), if ack_tx.is_some() => match line {
                    Ok(Some(line)) => match self.parser.parse(&line) {
                        Ok(record) => {
                            tracker.on_line_produced();
                            if let Some(tx) = &ack_tx {
                                let tx = tx.clone();
                                self.publisher.submit(&record, move |result| {
                                    let _ = tx.send(result);
                                });
                            }
                        }
                        Err(e) => {
                            tracker.on_line_source_error(UnitError::Parse(e));
                        }
                    },
                    Ok(None) => {
                        ack_tx = None;
                        tracker.on_line_source_done();
                    }
                    Err(e) => {
                        tracker.on_line_source_error(UnitError::LineSource(e));
                    }
                },
            }
        }
    }
}
