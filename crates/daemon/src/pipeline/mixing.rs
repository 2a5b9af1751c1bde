use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::warn;

use engine::audio::{AudioMix, Theme};
use engine::render::mix_audio_command;
use engine::Caption;

use crate::media::ffmpeg::FFmpegWrapper;
use crate::pipeline::{RenderFailure, Stage, StageExt};
use crate::services::{Narration, ThemeClassifier};

pub struct MixedAudio {
    pub theme: Theme,
    pub path: PathBuf,
}

pub async fn classify(captions: &[Caption], themes: &dyn ThemeClassifier) -> Theme {
    let transcript = captions
        .iter()
        .map(|c| c.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    match themes.infer_theme(&transcript).await {
        Ok(theme) => theme,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "theme classification failed, using default");
            Theme::default()
        }
    }
}

/// Mixes the narration over the theme's music bed into `scratch/mixed.wav`.
/// The mix is exactly as long as the narration.
pub async fn mix_audio(
    captions: &[Caption],
    narration: &Narration,
    themes: &dyn ThemeClassifier,
    music_dir: &Path,
    scratch: &Path,
) -> Result<MixedAudio, RenderFailure> {
    let theme = classify(captions, themes).await;
    let music = theme.music_path(music_dir);
    if !music.is_file() {
        return Err(RenderFailure::mixing(anyhow::anyhow!(
            "no music track for theme '{}' at {}",
            theme,
            music.display()
        )));
    }

    let info = FFmpegWrapper::probe(&music).await.stage(Stage::Mixing)?;
    let mix = AudioMix::new(
        narration.path.clone(),
        music,
        info.duration_seconds,
        narration.duration,
    )
    .context("planning audio mix")
    .stage(Stage::Mixing)?;

    let path = scratch.join("mixed.wav");
    FFmpegWrapper::run(&mix_audio_command(&mix, &path))
        .await
        .stage(Stage::Mixing)?;

    Ok(MixedAudio { theme, path })
}
