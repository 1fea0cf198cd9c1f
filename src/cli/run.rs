use crate::config::parse::{load_config, ConfigError};
use crate::config::types::Config;
use crate::index::{
    signer_from_config, DocumentPublisher, HttpIndexClient, IndexError, IndexName, IndexTarget,
    SigningError,
};
use crate::job::{BatchOutcome, ChannelSignal, EventError, Orchestrator, TriggerEvent};
use crate::pipeline::{SubmissionGate, UnitPipeline};
use crate::source::RecordParser;
use crate::storage::{self, StoreError};
use crate::web::run_server;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("index client error: {0}")]
    Index(#[from] IndexError),

    #[error("request signer error: {0}")]
    Signing(#[from] SigningError),

    #[error("trigger event error: {0}")]
    Event(#[from] EventError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("web server error: {0}")]
    WebServer(String),

    #[error("batch failed on {container}/{key}: {error}")]
    BatchFailed {
        container: String,
        key: String,
        error: String,
    },
}

fn require_config(config_path: Option<PathBuf>) -> Result<Config, RunError> {
    let Some(config_path) = config_path else {
        return Err(ConfigError::Validation(format!(
            "config not found. Searched ~/.config/elbindex/config.yml and {}.\n\
             Use --config <path> to specify a config file, \
             or run 'elbindex config init' to generate one.",
            crate::config::SYSTEM_CONFIG_PATH
        ))
        .into());
    };

    info!(config_path = %config_path.display(), "Loading configuration");
    Ok(load_config(&config_path)?)
}

/// Wire the ingestion pipeline described by `config`.
///
/// `index` is fixed for the lifetime of the returned orchestrator.
pub fn build_orchestrator(config: &Config, index: IndexName) -> Result<Orchestrator, RunError> {
    let store = storage::from_config(&config.object_store)?;
    let signer = signer_from_config(&config.index.auth)?;
    let backend = Arc::new(HttpIndexClient::new(&config.index, signer)?);

    let target = IndexTarget {
        index,
        doc_type: config.index.doc_type.clone(),
    };
    let publisher = DocumentPublisher::new(
        backend,
        target,
        SubmissionGate::new(config.index.max_in_flight),
    );

    let pipeline = UnitPipeline::new(
        store,
        Arc::new(RecordParser::new()),
        publisher,
        config.pipeline.line_buffer,
    )
    .with_max_line_bytes(config.pipeline.max_line_bytes);

    Ok(Orchestrator::new(pipeline))
}

async fn read_event(event_path: &Path) -> Result<TriggerEvent, RunError> {
    let mut text = String::new();
    if event_path == Path::new("-") {
        tokio::io::stdin().read_to_string(&mut text).await?;
    } else {
        text = tokio::fs::read_to_string(event_path).await?;
    }
    Ok(TriggerEvent::from_json(&text)?)
}

/// Process one trigger event and report its outcome
pub async fn run(
    config_path: Option<PathBuf>,
    event_path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = require_config(config_path)?;
    let index = IndexName::at_startup(&config.index.prefix);
    info!(index = %index, endpoint = %config.index.endpoint, "Index selected for this process");

    let orchestrator = build_orchestrator(&config, index)?;
    let units = read_event(&event_path).await?.units()?;

    let (signal, outcome_rx) = ChannelSignal::new();
    let handle = orchestrator.dispatch(units, Arc::new(signal));

    let outcome = outcome_rx.await.unwrap_or_else(|_| BatchOutcome::Failed {
        container: String::new(),
        key: String::new(),
        error: "batch ended without an outcome".to_string(),
    });
    println!("{}", serde_json::to_string(&outcome)?);

    match outcome {
        BatchOutcome::Succeeded { .. } => {
            let reports = handle.join().await;
            let docs: u64 = reports.iter().map(|r| r.docs_acknowledged).sum();
            info!(units = reports.len(), docs = docs, "All log records added to index");
            Ok(())
        }
        BatchOutcome::Failed {
            container,
            key,
            error,
        } => {
            error!(pending = handle.job().pending(), "Exiting after batch failure");
            Err(RunError::BatchFailed {
                container,
                key,
                error,
            }
            .into())
        }
    }
}

/// Accept trigger events over HTTP until interrupted
pub async fn serve(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = require_config(config_path)?;
    let index = IndexName::at_startup(&config.index.prefix);
    info!(index = %index, endpoint = %config.index.endpoint, "Index selected for this process");

    let orchestrator = build_orchestrator(&config, index)?;

    run_server(orchestrator, config.web.clone())
        .await
        .map_err(|e| RunError::WebServer(e.to_string()))?;

    Ok(())
}
