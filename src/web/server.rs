use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::WebConfig;
use crate::job::Orchestrator;

use super::api::{health_check, invoke, AppState};

/// Routes of the trigger API
pub fn create_router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState { orchestrator });

    Router::new()
        .route("/health", get(health_check))
        .route("/invoke", post(invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the trigger API until Ctrl+C
pub async fn run_server(
    orchestrator: Orchestrator,
    web_config: WebConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(&web_config.listen).await?;
    tracing::info!("Trigger server listening on {}", web_config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Trigger server shutting down gracefully");
        })
        .await?;

    Ok(())
}
