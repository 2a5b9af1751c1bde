use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use engine::{validate_captions, Caption};

use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::services::Transcriber;

/// Transcription through the local ML service's `/transcribe` endpoint.
pub struct MlServiceTranscriber {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Deserialize)]
struct TranscriptSegment {
    start: f64,
    end: f64,
    text: String,
}

impl MlServiceTranscriber {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        MlServiceTranscriber {
            http,
            base_url: config.ml_service_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        }
    }
}

/// Drops blank or zero-length segments and checks ordering.
fn to_captions(segments: Vec<TranscriptSegment>) -> Result<Vec<Caption>> {
    let captions: Vec<Caption> = segments
        .into_iter()
        .filter(|s| s.end > s.start && !s.text.trim().is_empty())
        .map(|s| Caption::new(s.start.max(0.0), s.end, s.text.trim()))
        .collect();
    validate_captions(&captions)?;
    Ok(captions)
}

#[async_trait]
impl Transcriber for MlServiceTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<Caption>> {
        let media_path = audio.to_string_lossy().to_string();
        let transcript: TranscriptResponse = self
            .retry
            .run("transcription", || async {
                let response = self
                    .http
                    .post(format!("{}/transcribe", self.base_url))
                    .json(&serde_json::json!({
                        "mediaPath": media_path
                    }))
                    .send()
                    .await?;

                if !response.status().is_success() {
                    anyhow::bail!("ML service transcribe failed: {}", response.status());
                }
                Ok(response.json().await?)
            })
            .await?;

        to_captions(transcript.segments)
    }
}
