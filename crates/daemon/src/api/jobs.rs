use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Json, Response},
    routing::get,
    Router,
};
use futures::StreamExt;
use serde::Serialize;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{error, info};

use crate::api::AppState;
use crate::jobs::{JobKind, JobRecord, JobStatus};

#[derive(Serialize)]
pub struct JobListResponse {
    jobs: Vec<JobRecord>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status/:job_id", get(get_status))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", axum::routing::delete(delete_job))
        .route("/download/:job_id", get(download))
        .route("/audio-status/:job_id", get(get_audio_status))
        .route("/audio-jobs", get(list_audio_jobs))
        .route("/download-audio/:job_id", get(download_audio))
}

fn store_error(e: anyhow::Error) -> StatusCode {
    error!(error = %format!("{:#}", e), "job store error");
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Looks up a job, treating a job of another kind as missing.
fn find_job(state: &AppState, job_id: &str, kind: Option<JobKind>) -> Result<JobRecord, StatusCode> {
    state
        .store
        .get(job_id)
        .map_err(store_error)?
        .filter(|job| kind.map_or(true, |k| job.kind == k))
        .ok_or(StatusCode::NOT_FOUND)
}

fn job_list(state: &AppState, kind: Option<JobKind>) -> Result<Json<JobListResponse>, StatusCode> {
    let jobs = state
        .store
        .list()
        .map_err(store_error)?
        .into_iter()
        .filter(|job| kind.map_or(true, |k| job.kind == k))
        .collect();
    Ok(Json(JobListResponse { jobs }))
}

async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, StatusCode> {
    find_job(&state, &job_id, None).map(Json)
}

async fn get_audio_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, StatusCode> {
    find_job(&state, &job_id, Some(JobKind::Audio)).map(Json)
}

async fn list_jobs(State(state): State<AppState>) -> Result<Json<JobListResponse>, StatusCode> {
    job_list(&state, None)
}

async fn list_audio_jobs(State(state): State<AppState>) -> Result<Json<JobListResponse>, StatusCode> {
    job_list(&state, Some(JobKind::Audio))
}

async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    if !state.store.remove(&job_id).map_err(store_error)? {
        return Err(StatusCode::NOT_FOUND);
    }
    info!(job_id, "job discarded");
    Ok(StatusCode::NO_CONTENT)
}

async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, StatusCode> {
    stream_output(find_job(&state, &job_id, None)?).await
}

async fn download_audio(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, StatusCode> {
    stream_output(find_job(&state, &job_id, Some(JobKind::Audio))?).await
}

async fn stream_output(job: JobRecord) -> Result<Response, StatusCode> {
    if job.status != JobStatus::Completed {
        return Err(StatusCode::BAD_REQUEST);
    }
    let file_path = job.output_file.ok_or(StatusCode::NOT_FOUND)?;

    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let (content_type, file_name) = match job.kind {
        JobKind::Video => ("video/mp4", format!("generated_video_{}.mp4", job.id)),
        JobKind::Audio => ("audio/wav", format!("generated_audio_{}.wav", job.id)),
    };

    let file = tokio::fs::File::open(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let stream = FramedRead::new(file, BytesCodec::new()).map(|chunk| chunk.map(|bytes| bytes.freeze()));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", file_name),
        )
        .body(Body::from_stream(stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
