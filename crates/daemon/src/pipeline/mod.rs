use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use engine::captions::CaptionStyle;
use engine::merger::merge_empty_intervals;
use engine::RenderSettings;

use crate::config::{Config, MissingAssetPolicy};
use crate::retry::RetryPolicy;
use crate::services::Collaborators;

pub mod compositing;
pub mod error;
pub mod mixing;
pub mod resolution;
pub mod segmentation;

pub use error::{RenderFailure, Stage, StageExt};

/// Receives milestone updates from a running render.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: u8, message: &str);
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub segment_seconds: f64,
    pub missing_asset_policy: MissingAssetPolicy,
    pub scratch_dir: PathBuf,
    pub music_dir: PathBuf,
    pub render: RenderSettings,
    pub caption_style: CaptionStyle,
    pub retry: RetryPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        PipelineSettings {
            segment_seconds: config.segment_seconds,
            missing_asset_policy: config.missing_asset_policy,
            scratch_dir: config.scratch_dir.clone(),
            music_dir: config.music_dir.clone(),
            render: RenderSettings::default(),
            caption_style: CaptionStyle {
                font: config.caption_font.clone(),
                ..CaptionStyle::default()
            },
            retry: config.retry.clone(),
        }
    }
}

/// Turns narration text into a finished short. Holds no per-render state, so
/// one instance can serve any number of concurrent renders.
pub struct Composer {
    collaborators: Collaborators,
    http: reqwest::Client,
    settings: PipelineSettings,
}

impl Composer {
    pub fn new(collaborators: Collaborators, http: reqwest::Client, settings: PipelineSettings) -> Self {
        Composer {
            collaborators,
            http,
            settings,
        }
    }

    fn scratch_dir(&self, job_id: &str) -> Result<tempfile::TempDir> {
        std::fs::create_dir_all(&self.settings.scratch_dir)?;
        tempfile::Builder::new()
            .prefix(&format!("shortgen-{}-", job_id))
            .tempdir_in(&self.settings.scratch_dir)
            .context("Failed to create scratch directory")
    }

    /// Renders `narration_text` into `output`. Every temporary file lives in
    /// a scratch directory that is removed when this returns.
    pub async fn compose(
        &self,
        job_id: &str,
        narration_text: &str,
        output: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, RenderFailure> {
        let scratch = self.scratch_dir(job_id).stage(Stage::Segmentation)?;
        let scratch_path = scratch.path();

        progress.report(20, "Generating audio...");
        let narration = self
            .collaborators
            .synthesizer
            .synthesize(narration_text, &scratch_path.join("narration.wav"))
            .await
            .context("speech synthesis")
            .stage(Stage::Segmentation)?;
        info!(job_id, duration = narration.duration, "narration ready");

        progress.report(40, "Generating captions...");
        let captions = self
            .collaborators
            .transcriber
            .transcribe(&narration.path)
            .await
            .context("transcription")
            .stage(Stage::Segmentation)?;
        if captions.is_empty() {
            return Err(RenderFailure::segmentation(anyhow::anyhow!(
                "transcription produced no captions"
            )));
        }
        info!(job_id, captions = captions.len(), "captions ready");

        progress.report(60, "Generating video search queries...");
        let windows = segmentation::build_windows(
            &captions,
            self.settings.segment_seconds,
            self.collaborators.keywords.as_ref(),
        )
        .await?;
        let window_count = windows.len();
        let windows = merge_empty_intervals(windows);
        if windows.is_empty() {
            return Err(RenderFailure::segmentation(anyhow::anyhow!(
                "keyword service returned nothing for all {} windows",
                window_count
            )));
        }
        info!(job_id, windows = window_count, resolvable = windows.len(), "timeline segmented");

        progress.report(80, "Fetching background videos...");
        let resolver = resolution::Resolver {
            footage: self.collaborators.footage.as_ref(),
            http: &self.http,
            retry: &self.settings.retry,
            scratch: scratch_path,
            settings: &self.settings.render,
            policy: self.settings.missing_asset_policy,
        };
        let segments = resolver.resolve_all(&windows).await?;
        info!(job_id, segments = segments.len(), "background footage resolved");

        progress.report(90, "Rendering final video...");
        let mixed = mixing::mix_audio(
            &captions,
            &narration,
            self.collaborators.themes.as_ref(),
            &self.settings.music_dir,
            scratch_path,
        )
        .await?;
        info!(job_id, theme = %mixed.theme, "audio mixed");

        let job = compositing::CompositeJob {
            segments: &segments,
            captions: &captions,
            mixed_audio: &mixed.path,
            total_duration: narration.duration,
            scratch: scratch_path,
            settings: &self.settings.render,
            style: &self.settings.caption_style,
        };
        let output = compositing::composite(&job, output).await?;
        info!(job_id, output = %output.display(), "render complete");

        Ok(output)
    }

    /// Narration only, written straight to `output`.
    pub async fn narrate(&self, narration_text: &str, output: &Path) -> Result<PathBuf> {
        let narration = self
            .collaborators
            .synthesizer
            .synthesize(narration_text, output)
            .await
            .context("speech synthesis")?;
        Ok(narration.path)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use engine::audio::Theme;
    use engine::Caption;

    use crate::services::{
        AssetCandidate, FootageProvider, KeywordService, Narration, ScriptWriter, SpeechSynthesizer,
        ThemeClassifier, Transcriber,
    };

    pub struct NoProgress;

    impl ProgressSink for NoProgress {
        fn report(&self, _progress: u8, _message: &str) {}
    }

    pub struct FixedNarration(pub f64);

    #[async_trait]
    impl SpeechSynthesizer for FixedNarration {
        async fn synthesize(&self, _text: &str, output: &Path) -> Result<Narration> {
            Ok(Narration {
                path: output.to_path_buf(),
                duration: self.0,
            })
        }
    }

    pub struct FixedCaptions(pub Vec<Caption>);

    #[async_trait]
    impl Transcriber for FixedCaptions {
        async fn transcribe(&self, _audio: &Path) -> Result<Vec<Caption>> {
            Ok(self.0.clone())
        }
    }

    /// Echoes the window text back as its only keyword; blank text yields
    /// nothing. Records every request.
    #[derive(Default)]
    pub struct EchoKeywords {
        pub requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl KeywordService for EchoKeywords {
        async fn infer_keywords(&self, text: &str) -> Result<Option<Vec<String>>> {
            self.requests.lock().unwrap().push(text.to_string());
            if text.contains("nothing") {
                return Ok(None);
            }
            Ok(Some(vec![text.to_string(), "spare".to_string()]))
        }
    }

    pub struct FixedTheme(pub Theme);

    #[async_trait]
    impl ThemeClassifier for FixedTheme {
        async fn infer_theme(&self, _text: &str) -> Result<Theme> {
            Ok(self.0)
        }
    }

    /// Footage provider with no results. Records every keyword searched.
    #[derive(Default)]
    pub struct EmptyFootage {
        pub searched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FootageProvider for EmptyFootage {
        async fn search_asset(&self, keyword: &str) -> Result<Option<AssetCandidate>> {
            self.searched.lock().unwrap().push(keyword.to_string());
            Ok(None)
        }
    }

    pub struct FixedScript(pub String);

    #[async_trait]
    impl ScriptWriter for FixedScript {
        async fn generate_script(&self, _topic: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    pub fn collaborators(captions: Vec<Caption>, footage: Arc<EmptyFootage>) -> Collaborators {
        Collaborators {
            synthesizer: Arc::new(FixedNarration(9.0)),
            transcriber: Arc::new(FixedCaptions(captions)),
            keywords: Arc::new(EchoKeywords::default()),
            themes: Arc::new(FixedTheme(Theme::Sad)),
            footage,
            scripts: Arc::new(FixedScript("Honey never spoils.".to_string())),
        }
    }

    pub fn settings(scratch_dir: &Path, policy: MissingAssetPolicy) -> PipelineSettings {
        PipelineSettings {
            segment_seconds: 4.0,
            missing_asset_policy: policy,
            scratch_dir: scratch_dir.to_path_buf(),
            music_dir: scratch_dir.join("music"),
            render: RenderSettings::default(),
            caption_style: CaptionStyle::default(),
            retry: RetryPolicy::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::{Arc, Mutex};

    use engine::Caption;

    #[derive(Default)]
    struct RecordingProgress(Mutex<Vec<u8>>);

    impl ProgressSink for RecordingProgress {
        fn report(&self, progress: u8, _message: &str) {
            self.0.lock().unwrap().push(progress);
        }
    }

    fn scenario_captions() -> Vec<Caption> {
        vec![
            Caption::new(0.0, 2.0, "a"),
            Caption::new(2.0, 5.0, "b"),
            Caption::new(5.0, 9.0, "c"),
        ]
    }

    #[tokio::test]
    async fn all_windows_unresolved_fails_resolution_without_output() {
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("out").join("video_job.mp4");

        for policy in [MissingAssetPolicy::Abort, MissingAssetPolicy::Drop] {
            let footage = Arc::new(EmptyFootage::default());
            let composer = Composer::new(
                collaborators(scenario_captions(), footage.clone()),
                reqwest::Client::new(),
                settings(root.path(), policy),
            );
            let progress = RecordingProgress::default();

            let failure = composer
                .compose("job", "a b c", &output, &progress)
                .await
                .unwrap_err();

            assert_eq!(failure.stage, Stage::Resolution);
            assert!(!output.exists());
            assert_eq!(*progress.0.lock().unwrap(), vec![20, 40, 60, 80]);

            let searched = footage.searched.lock().unwrap().clone();
            match policy {
                MissingAssetPolicy::Abort => assert_eq!(searched, vec!["a b".to_string()]),
                MissingAssetPolicy::Drop => {
                    assert_eq!(searched, vec!["a b".to_string(), "c".to_string()])
                }
            }
        }

        let leftovers: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("shortgen-"))
            .collect();
        assert!(leftovers.is_empty(), "scratch directories were not removed");
    }

    #[tokio::test]
    async fn no_captions_is_a_segmentation_failure() {
        let root = tempfile::tempdir().unwrap();
        let composer = Composer::new(
            collaborators(Vec::new(), Arc::new(EmptyFootage::default())),
            reqwest::Client::new(),
            settings(root.path(), MissingAssetPolicy::Abort),
        );
        let failure = composer
            .compose("job", "", &root.path().join("o.mp4"), &NoProgress)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Segmentation);
    }

    #[tokio::test]
    async fn every_window_without_keywords_is_a_segmentation_failure() {
        let root = tempfile::tempdir().unwrap();
        let captions = vec![Caption::new(0.0, 3.0, "nothing here"), Caption::new(4.0, 6.0, "nothing")];
        let footage = Arc::new(EmptyFootage::default());
        let composer = Composer::new(
            collaborators(captions, footage.clone()),
            reqwest::Client::new(),
            settings(root.path(), MissingAssetPolicy::Abort),
        );
        let failure = composer
            .compose("job", "nothing", &root.path().join("o.mp4"), &NoProgress)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Segmentation);
        assert!(footage.searched.lock().unwrap().is_empty());
    }
}
