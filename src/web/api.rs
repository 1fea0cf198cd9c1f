use crate::job::{BatchOutcome, Orchestrator, TriggerEvent};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Shared state for the trigger API
pub struct AppState {
    pub orchestrator: Orchestrator,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Run one notification batch and answer with its outcome.
///
/// 200 when every object was fully indexed, 502 when the batch failed and
/// 400 when the event could not be decoded.
pub async fn invoke(State(state): State<Arc<AppState>>, body: String) -> Response {
    let units = match TriggerEvent::from_json(&body).and_then(|event| event.units()) {
        Ok(units) => units,
        Err(e) => {
            warn!(error = %e, "Rejected trigger event");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    let outcome = state.orchestrator.run(units).await;
    let status = match outcome {
        BatchOutcome::Succeeded { .. } => StatusCode::OK,
        BatchOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };

    (status, Json(outcome)).into_response()
}
