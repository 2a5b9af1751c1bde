use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use engine::captions::{wrap_text, CaptionOverlay, CaptionStyle};
use engine::fit::DurationFit;
use engine::render::{compose_command, concat_command, concat_list_body, CompositionInputs};
use engine::{total_fitted_duration, Caption, RenderSettings, ResolvedSegment};

use crate::media::ffmpeg::FFmpegWrapper;
use crate::pipeline::{RenderFailure, Stage, StageExt};

pub struct CompositeJob<'a> {
    pub segments: &'a [ResolvedSegment],
    pub captions: &'a [Caption],
    pub mixed_audio: &'a Path,
    /// Narration length; the output is exactly this long.
    pub total_duration: f64,
    pub scratch: &'a Path,
    pub settings: &'a RenderSettings,
    pub style: &'a CaptionStyle,
}

/// Output is written next to `output` with a `.partial` suffix and only
/// renamed into place once ffmpeg succeeds.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

async fn write_caption_files(
    captions: &[Caption],
    scratch: &Path,
    width: usize,
) -> Result<Vec<CaptionOverlay>> {
    let mut overlays = Vec::with_capacity(captions.len());
    for (index, caption) in captions.iter().enumerate() {
        let text_file = scratch.join(format!("caption_{:03}.txt", index));
        tokio::fs::write(&text_file, wrap_text(&caption.text, width))
            .await
            .with_context(|| format!("writing {}", text_file.display()))?;
        overlays.push(CaptionOverlay {
            time_range: caption.time_range,
            text_file,
        });
    }
    Ok(overlays)
}

async fn concat_background(segments: &[ResolvedSegment], scratch: &Path) -> Result<PathBuf> {
    let mut ordered: Vec<&ResolvedSegment> = segments.iter().collect();
    ordered.sort_by(|a, b| a.time_range.start.total_cmp(&b.time_range.start));
    let paths: Vec<PathBuf> = ordered.iter().map(|s| PathBuf::from(&s.asset_path)).collect();

    let list_path = scratch.join("segments.txt");
    tokio::fs::write(&list_path, concat_list_body(&paths)).await?;

    let background = scratch.join("background.mp4");
    let command = concat_command(&list_path, &background, paths.len())?;
    FFmpegWrapper::run(&command).await?;
    Ok(background)
}

/// Plans the loop and trim from the concatenated file's measured length,
/// which can drift from the sum of the fitted segments.
fn plan_background(measured: f64, job: &CompositeJob<'_>) -> Result<DurationFit> {
    let expected = total_fitted_duration(job.segments);
    let fit = DurationFit::plan(measured, job.total_duration)?;
    info!(
        background = measured,
        expected,
        narration = job.total_duration,
        strategy = ?fit.strategy(),
        "fitting background to narration"
    );
    Ok(fit)
}

pub async fn composite(job: &CompositeJob<'_>, output: &Path) -> Result<PathBuf, RenderFailure> {
    let background = concat_background(job.segments, job.scratch)
        .await
        .context("concatenating background")
        .stage(Stage::Compositing)?;

    let measured = FFmpegWrapper::probe(&background)
        .await
        .context("measuring background")
        .stage(Stage::Compositing)?
        .duration_seconds;
    let background_fit = plan_background(measured, job).stage(Stage::Compositing)?;

    let overlays = write_caption_files(
        job.captions,
        job.scratch,
        job.style.wrap_width(job.settings.resolution),
    )
    .await
    .stage(Stage::Compositing)?;

    let inputs = CompositionInputs {
        background: &background,
        background_fit,
        mixed_audio: job.mixed_audio,
        overlays: &overlays,
        style: job.style,
        settings: job.settings,
    };
    let partial = partial_path(output);
    let command = compose_command(&inputs, &partial);

    let encoded = async {
        FFmpegWrapper::run(&command).await?;
        tokio::fs::rename(&partial, output)
            .await
            .with_context(|| format!("moving {} into place", output.display()))?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    if let Err(e) = encoded {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %cleanup, "failed to remove partial output");
            }
        }
        return Err(RenderFailure::compositing(e));
    }
    Ok(output.to_path_buf())
}
