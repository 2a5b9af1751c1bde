use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::jobs::processor::JobProcessor;
use crate::jobs::JobStore;
use crate::services::ScriptWriter;

pub mod generate;
pub mod jobs;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn JobStore>,
    pub processor: Arc<JobProcessor>,
    pub scripts: Arc<dyn ScriptWriter>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    ok: bool,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(generate::router())
        .merge(jobs::router());

    Router::new().nest("/api/v1", api).with_state(state)
}
