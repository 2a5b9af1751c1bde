use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

use engine::fit::{DurationFit, ScaleFit};
use engine::render::fit_segment_command;
use engine::{RenderSettings, ResolvedSegment, Window};

use crate::config::MissingAssetPolicy;
use crate::media::ffmpeg::FFmpegWrapper;
use crate::media::{download_to_file, url_digest};
use crate::pipeline::RenderFailure;
use crate::retry::RetryPolicy;
use crate::services::{AssetCandidate, FootageProvider};

/// Finds, downloads and normalises footage for each merged window.
pub struct Resolver<'a> {
    pub footage: &'a dyn FootageProvider,
    pub http: &'a reqwest::Client,
    pub retry: &'a RetryPolicy,
    pub scratch: &'a Path,
    pub settings: &'a RenderSettings,
    pub policy: MissingAssetPolicy,
}

impl<'a> Resolver<'a> {
    /// Windows are processed in order. Segments come back in timeline order
    /// with their asset already fitted to the window length and frame.
    pub async fn resolve_all(&self, windows: &[Window]) -> Result<Vec<ResolvedSegment>, RenderFailure> {
        let mut segments = Vec::with_capacity(windows.len());

        for (index, window) in windows.iter().enumerate() {
            match self.resolve_window(index, window).await {
                Ok(segment) => segments.push(segment),
                Err(e) => match self.policy {
                    MissingAssetPolicy::Abort => {
                        return Err(RenderFailure::resolution(e.context(format!(
                            "window {} ({:.3}s to {:.3}s)",
                            index, window.time_range.start, window.time_range.end
                        ))));
                    }
                    MissingAssetPolicy::Drop => {
                        warn!(window = index, error = %format!("{:#}", e), "dropping unresolved window");
                    }
                },
            }
        }

        if segments.is_empty() {
            return Err(RenderFailure::resolution(anyhow::anyhow!(
                "none of the {} windows could be resolved",
                windows.len()
            )));
        }
        Ok(segments)
    }

    async fn resolve_window(&self, index: usize, window: &Window) -> Result<ResolvedSegment> {
        let keyword = window
            .primary_keyword()
            .context("window has no keyword")?;
        let candidate = self
            .footage
            .search_asset(keyword)
            .await?
            .with_context(|| format!("no footage found for '{}'", keyword))?;

        let raw_path = self
            .scratch
            .join(format!("raw_{}.mp4", url_digest(&candidate.url)));
        let bytes = download_to_file(self.http, self.retry, &candidate.url, &raw_path).await?;
        info!(window = index, keyword, bytes, "footage downloaded");

        let fitted_path = self.scratch.join(format!("segment_{:03}.mp4", index));
        let fitted = self.fit_asset(window, &candidate, &raw_path, &fitted_path).await;
        if let Err(e) = tokio::fs::remove_file(&raw_path).await {
            debug!(path = %raw_path.display(), error = %e, "failed to remove raw download");
        }
        let (source_duration, source_resolution) = fitted?;

        Ok(ResolvedSegment {
            time_range: window.time_range,
            asset_path: fitted_path.to_string_lossy().to_string(),
            source_duration,
            source_resolution,
        })
    }

    async fn fit_asset(
        &self,
        window: &Window,
        candidate: &AssetCandidate,
        raw_path: &Path,
        fitted_path: &Path,
    ) -> Result<(f64, engine::Resolution)> {
        let info = FFmpegWrapper::probe(raw_path).await?;
        let duration_fit = DurationFit::plan(info.duration_seconds, window.time_range.duration())?;
        let source_resolution = source_resolution(info.resolution(), candidate);
        let scale_fit = ScaleFit::new(source_resolution, self.settings.resolution);

        let command = fit_segment_command(raw_path, fitted_path, &duration_fit, &scale_fit, self.settings);
        FFmpegWrapper::run(&command).await?;

        info!(
            source = info.duration_seconds,
            target = duration_fit.trim_to,
            loops = duration_fit.loops,
            strategy = ?duration_fit.strategy(),
            "segment fitted"
        );
        Ok((info.duration_seconds, source_resolution))
    }
}

/// ffprobe reports 0x0 when it finds no video stream header; the provider's
/// listed size is used then.
fn source_resolution(probed: engine::Resolution, candidate: &AssetCandidate) -> engine::Resolution {
    if probed.width > 0 && probed.height > 0 {
        probed
    } else {
        engine::Resolution {
            width: candidate.width,
            height: candidate.height,
        }
    }
}
