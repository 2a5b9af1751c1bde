use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::AppState;
use crate::jobs::{JobKind, JobStatus};

#[derive(Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    job_id: String,
    status: JobStatus,
    message: String,
}

#[derive(Deserialize)]
pub struct ScriptRequest {
    #[serde(default)]
    topic: Option<String>,
}

#[derive(Serialize)]
pub struct ScriptResponse {
    script: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_video))
        .route("/generate-audio", post(generate_audio))
        .route("/script", post(generate_script))
}

fn required_text(text: Option<String>) -> Result<String, StatusCode> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

fn queue(state: &AppState, kind: JobKind, text: String) -> Result<GenerateResponse, StatusCode> {
    let job = state.store.create(kind).map_err(|e| {
        error!(error = %format!("{:#}", e), "failed to create job");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    info!(job_id = %job.id, kind = ?kind, "job queued");

    match kind {
        JobKind::Video => {
            let output = state.config.video_output_path(&job.id);
            state.processor.spawn_video(job.id.clone(), text, output);
        }
        JobKind::Audio => {
            let output = state.config.audio_output_path(&job.id);
            state.processor.spawn_audio(job.id.clone(), text, output);
        }
    }

    Ok(GenerateResponse {
        job_id: job.id,
        status: job.status,
        message: "Generation started".to_string(),
    })
}

async fn generate_video(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), StatusCode> {
    let text = required_text(req.text)?;
    let response = queue(&state, JobKind::Video, text)?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

async fn generate_audio(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), StatusCode> {
    let text = required_text(req.text)?;
    let response = queue(&state, JobKind::Audio, text)?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

async fn generate_script(
    State(state): State<AppState>,
    Json(req): Json<ScriptRequest>,
) -> Result<Json<ScriptResponse>, StatusCode> {
    let topic = required_text(req.topic)?;
    let script = state.scripts.generate_script(&topic).await.map_err(|e| {
        error!(topic, error = %format!("{:#}", e), "script generation failed");
        StatusCode::BAD_GATEWAY
    })?;
    Ok(Json(ScriptResponse { script }))
}
