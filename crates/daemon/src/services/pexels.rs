use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::services::{AssetCandidate, FootageProvider};

const PEXELS_API_BASE: &str = "https://api.pexels.com";
const PORTRAIT_MIN_HEIGHT: i32 = 1920;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    width: i32,
    height: i32,
    duration: f64,
    #[serde(default)]
    video_files: Vec<PexelsVideoFile>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideoFile {
    quality: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    link: String,
}

pub struct PexelsClient {
    http: reqwest::Client,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl PexelsClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        PexelsClient {
            http,
            api_key: config.pexels_api_key.clone(),
            retry: config.retry.clone(),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("PEXELS_API_KEY environment variable not set"))
    }
}

/// First video; its first HD file at least 1920 tall, else its first file.
fn pick_candidate(response: SearchResponse) -> Option<AssetCandidate> {
    let video = response.videos.into_iter().next()?;
    let file_index = video
        .video_files
        .iter()
        .position(|f| {
            f.quality.as_deref() == Some("hd") && f.height.unwrap_or(0) >= PORTRAIT_MIN_HEIGHT
        })
        .unwrap_or(0);
    let file = video.video_files.into_iter().nth(file_index)?;

    Some(AssetCandidate {
        url: file.link,
        width: file.width.unwrap_or(video.width),
        height: file.height.unwrap_or(video.height),
        duration: video.duration,
    })
}

#[async_trait]
impl FootageProvider for PexelsClient {
    async fn search_asset(&self, keyword: &str) -> Result<Option<AssetCandidate>> {
        let api_key = self.api_key()?;

        let response: SearchResponse = self
            .retry
            .run("footage search", || async {
                let response = self
                    .http
                    .get(format!("{}/videos/search", PEXELS_API_BASE))
                    .header("Authorization", api_key)
                    .query(&[
                        ("query", keyword),
                        ("per_page", "1"),
                        ("orientation", "portrait"),
                        ("size", "large"),
                    ])
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    anyhow::bail!("Pexels API error: {} - {}", status, error_text);
                }
                Ok(response.json().await?)
            })
            .await?;

        let candidate = pick_candidate(response);
        match &candidate {
            Some(c) => debug!(keyword, url = %c.url, duration = c.duration, "footage found"),
            None => warn!(keyword, "no footage found"),
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> SearchResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn prefers_tall_hd_file() {
        let r = response(
            r#"{"videos": [{"width": 2160, "height": 3840, "duration": 14,
                "video_files": [
                    {"quality": "sd", "width": 540, "height": 960, "link": "https://v/sd.mp4"},
                    {"quality": "hd", "width": 720, "height": 1280, "link": "https://v/hd720.mp4"},
                    {"quality": "hd", "width": 1080, "height": 1920, "link": "https://v/hd1080.mp4"}
                ]}]}"#,
        );
        let candidate = pick_candidate(r).unwrap();
        assert_eq!(candidate.url, "https://v/hd1080.mp4");
        assert_eq!((candidate.width, candidate.height), (1080, 1920));
        assert_eq!(candidate.duration, 14.0);
    }

    #[test]
    fn falls_back_to_first_file() {
        let r = response(
            r#"{"videos": [{"width": 1920, "height": 1080, "duration": 7.5,
                "video_files": [
                    {"quality": "sd", "width": null, "height": null, "link": "https://v/first.mp4"},
                    {"quality": "hd", "width": 1280, "height": 720, "link": "https://v/second.mp4"}
                ]}]}"#,
        );
        let candidate = pick_candidate(r).unwrap();
        assert_eq!(candidate.url, "https://v/first.mp4");
        assert_eq!((candidate.width, candidate.height), (1920, 1080));
    }

    #[test]
    fn no_videos_is_none() {
        assert!(pick_candidate(response(r#"{"videos": []}"#)).is_none());
        assert!(pick_candidate(response(r#"{"page": 1}"#)).is_none());
    }
}
