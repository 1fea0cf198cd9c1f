use crate::job::event::IngestionUnit;
use crate::job::signal::{BatchOutcome, ChannelSignal, CompletionSignal, OnceSignal};
use crate::pipeline::{UnitError, UnitPipeline, UnitReport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Units of one invocation sharing a single completion signal.
///
/// The signal fires success once every unit succeeded, or failure on the
/// first failed unit. Outcomes arriving after that are discarded.
pub struct BatchJob {
    id: Uuid,
    total: usize,
    pending: AtomicUsize,
    signal: OnceSignal,
}

impl BatchJob {
    pub fn new(total: usize, signal: Arc<dyn CompletionSignal>) -> Self {
        let job = Self {
            id: Uuid::new_v4(),
            total,
            pending: AtomicUsize::new(total),
            signal: OnceSignal::new(signal),
        };

        if total == 0 {
            info!(batch_id = %job.id, "Empty batch, nothing to ingest");
            job.signal.try_succeed(0);
        }

        job
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Units that have not yet succeeded
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_decided(&self) -> bool {
        self.signal.is_decided()
    }

    /// Fold one unit's final report into the batch outcome.
    ///
    /// Returns `true` when this report decided the batch.
    pub fn record(&self, report: &UnitReport) -> bool {
        match &report.outcome {
            Ok(()) => {
                let remaining = self.pending.fetch_sub(1, Ordering::AcqRel) - 1;
                if remaining > 0 {
                    return false;
                }
                if self.signal.try_succeed(self.total) {
                    info!(batch_id = %self.id, units = self.total, "Batch succeeded");
                    true
                } else {
                    debug!(batch_id = %self.id, "Batch already decided, late success discarded");
                    false
                }
            }
            Err(e) => {
                if self.signal.try_fail(&report.unit, e) {
                    error!(
                        batch_id = %self.id,
                        unit = %report.unit,
                        error = %e,
                        "Batch failed"
                    );
                    true
                } else {
                    warn!(
                        batch_id = %self.id,
                        unit = %report.unit,
                        error = %e,
                        "Unit failed after batch was decided"
                    );
                    false
                }
            }
        }
    }
}

/// Running batch: the shared job plus one task per unit
pub struct BatchHandle {
    job: Arc<BatchJob>,
    tasks: Vec<JoinHandle<UnitReport>>,
}

impl BatchHandle {
    pub fn job(&self) -> &Arc<BatchJob> {
        &self.job
    }

    /// Wait for every unit to finish, including those still running after
    /// the batch was decided.
    pub async fn join(self) -> Vec<UnitReport> {
        let mut reports = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            match task.await {
                Ok(report) => reports.push(report),
                Err(e) => error!(error = %e, "Unit supervisor task join error"),
            }
        }
        reports
    }
}

/// Starts one pipeline per ingestion unit and owns the batch signal.
#[derive(Clone)]
pub struct Orchestrator {
    pipeline: UnitPipeline,
}

impl Orchestrator {
    pub fn new(pipeline: UnitPipeline) -> Self {
        Self { pipeline }
    }

    /// Start every unit concurrently without waiting for any of them.
    pub fn dispatch(
        &self,
        units: Vec<IngestionUnit>,
        signal: Arc<dyn CompletionSignal>,
    ) -> BatchHandle {
        let job = Arc::new(BatchJob::new(units.len(), signal));
        info!(batch_id = %job.id(), units = units.len(), "Dispatching batch");

        let tasks = units
            .into_iter()
            .map(|unit| {
                let pipeline = self.pipeline.clone();
                let job = Arc::clone(&job);

                tokio::spawn(async move {
                    let running = tokio::spawn({
                        let unit = unit.clone();
                        async move { pipeline.run(unit).await }
                    });

                    let report = match running.await {
                        Ok(report) => report,
                        Err(e) => UnitReport {
                            unit,
                            lines_seen: 0,
                            docs_acknowledged: 0,
                            outcome: Err(UnitError::Aborted(e.to_string())),
                        },
                    };

                    job.record(&report);
                    report
                })
            })
            .collect();

        BatchHandle { job, tasks }
    }

    /// Run a batch and wait for its outcome.
    pub async fn run(&self, units: Vec<IngestionUnit>) -> BatchOutcome {
        let (signal, rx) = ChannelSignal::new();
        let _handle = self.dispatch(units, Arc::new(signal));

        rx.await.unwrap_or_else(|_| BatchOutcome::Failed {
            container: String::new(),
            key: String::new(),
            error: "batch ended without an outcome".to_string(),
        })
    }
}
