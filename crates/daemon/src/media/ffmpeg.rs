use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use engine::render::RenderCommand;
use engine::Resolution;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub fps_num: i32,
    pub fps_den: i32,
    pub width: i32,
    pub height: i32,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutput {
    format: Option<FormatInfo>,
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Parses a frame rate of the form "30/1" or "30000/1001".
fn parse_frame_rate(raw: &str) -> Option<(i32, i32)> {
    let (num, den) = raw.split_once('/')?;
    let num = num.parse::<i32>().ok()?;
    let den = den.parse::<i32>().ok()?;
    if den == 0 {
        None
    } else {
        Some((num, den))
    }
}

impl ProbeOutput {
    fn into_media_info(self) -> Result<MediaInfo> {
        let duration_seconds = self
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| *d > 0.0)
            .context("ffprobe reported no usable duration")?;

        let video_stream = self
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));

        let (width, height, fps_num, fps_den) = match video_stream {
            Some(vs) => {
                let (num, den) = vs
                    .r_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .or_else(|| vs.avg_frame_rate.as_deref().and_then(parse_frame_rate))
                    .unwrap_or((30, 1));
                (vs.width.unwrap_or(0), vs.height.unwrap_or(0), num, den)
            }
            None => (0, 0, 30, 1),
        };

        let has_audio = self
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(MediaInfo {
            duration_seconds,
            fps_num,
            fps_den,
            width,
            height,
            has_audio,
        })
    }
}

pub struct FFmpegWrapper;

impl FFmpegWrapper {
    pub async fn probe(media_path: &Path) -> Result<MediaInfo> {
        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration:stream=codec_type,width,height,r_frame_rate,avg_frame_rate")
            .arg("-of")
            .arg("json")
            .arg(media_path)
            .output()
            .await
            .context("Failed to execute ffprobe. Make sure FFmpeg is installed.")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffprobe failed for {}: {}", media_path.display(), stderr.trim());
        }

        let probe_output: ProbeOutput = serde_json::from_slice(&output.stdout)
            .context("Failed to parse ffprobe JSON output")?;
        probe_output
            .into_media_info()
            .with_context(|| format!("unusable media file {}", media_path.display()))
    }

    /// Runs one ffmpeg invocation and fails with the tail of stderr.
    pub async fn run(command: &RenderCommand) -> Result<()> {
        if let Some(parent) = command.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(args = ?command.ffmpeg_args, "running ffmpeg");

        let output = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-nostdin")
            .args(&command.ffmpeg_args)
            .output()
            .await
            .context("Failed to execute ffmpeg. Make sure FFmpeg is installed.")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(8).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            anyhow::bail!(
                "ffmpeg failed writing {} ({}): {}",
                command.output_path.display(),
                output.status,
                tail.join(" | ")
            );
        }

        Ok(())
    }
}
