//! # `partscan-server`
//!
//! The HTTP surface for the photo-intake pipeline: a small axum application
//! that starts one background analysis run at a time and lets callers poll
//! its progress or signal it to stop.

pub mod config;
mod errors;
mod state;

pub use state::{build_app_state, AppState};

use crate::errors::AppError;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use partscan::{Orchestrator, RunSnapshot};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_handler))
        .route("/status", get(status_handler))
        .route("/stop", post(stop_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

/// The root handler.
async fn root() -> &'static str {
    "partscan server is running."
}

/// The health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// The response body for the `/analyze` endpoint.
#[derive(Serialize)]
struct AnalyzeResponse {
    status: &'static str,
}

/// The handler for the `/analyze` endpoint.
///
/// Starts one background run over the configured source folder. Only one
/// run may be active at a time; a second request while a run is unfinished
/// is rejected with a conflict.
async fn analyze_handler(
    State(app_state): State<AppState>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut current = app_state.current_run.write().await;
    if let Some(run) = current.as_ref() {
        if !run.snapshot().finished {
            return Err(AppError::Conflict(
                "An analysis run is already in progress.".to_string(),
            ));
        }
    }

    let orchestrator = Arc::new(Orchestrator::new(
        app_state.vision.clone(),
        app_state.store.clone(),
        app_state.sink.clone(),
        app_state.config.prompt_spec(),
        app_state.config.run_config(),
    ));
    *current = Some(orchestrator.clone());
    drop(current);

    info!("Starting analysis run");
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run().await {
            error!("Analysis run failed: {e}");
        }
    });

    Ok(Json(AnalyzeResponse { status: "started" }))
}

/// The response body for the `/status` endpoint.
#[derive(Serialize)]
struct StatusResponse {
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<RunSnapshot>,
}

/// The handler for the `/status` endpoint. Polling never blocks the worker:
/// it reads a consistent snapshot of the run state.
async fn status_handler(State(app_state): State<AppState>) -> Json<StatusResponse> {
    let current = app_state.current_run.read().await;
    match current.as_ref() {
        Some(run) => {
            let snapshot = run.snapshot();
            Json(StatusResponse {
                active: !snapshot.finished,
                run: Some(snapshot),
            })
        }
        None => Json(StatusResponse {
            active: false,
            run: None,
        }),
    }
}

/// The response body for the `/stop` endpoint.
#[derive(Serialize)]
struct StopResponse {
    status: &'static str,
}

/// The handler for the `/stop` endpoint. The signal is honored between
/// batches: the in-flight batch finishes first.
async fn stop_handler(State(app_state): State<AppState>) -> Json<StopResponse> {
    let current = app_state.current_run.read().await;
    match current.as_ref() {
        Some(run) if !run.snapshot().finished => {
            run.cancel();
            Json(StopResponse { status: "stopping" })
        }
        _ => Json(StopResponse { status: "idle" }),
    }
}

/// The main entry point for running the server.
pub async fn run(listener: tokio::net::TcpListener, app_state: AppState) -> anyhow::Result<()> {
    let app = create_router(app_state);
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
