use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::fit::DurationFit;
use crate::timeline::TimelineError;

pub const VOICE_GAIN: f64 = 1.0;
pub const BACKGROUND_GAIN: f64 = 0.05;

/// Closed set of moods used to pick background music.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Comedy,
    Exciting,
    Relaxing,
    Sad,
    Thriller,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Comedy,
        Theme::Exciting,
        Theme::Relaxing,
        Theme::Sad,
        Theme::Thriller,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Comedy => "comedy",
            Theme::Exciting => "exciting",
            Theme::Relaxing => "relaxing",
            Theme::Sad => "sad",
            Theme::Thriller => "thriller",
        }
    }

    /// Exact (case-insensitive) label match.
    pub fn from_label(label: &str) -> Option<Theme> {
        let label = label.trim().to_lowercase();
        Theme::ALL.into_iter().find(|t| t.as_str() == label)
    }

    pub fn music_file_name(&self) -> String {
        format!("{}.mp3", self.as_str())
    }

    pub fn music_path(&self, music_dir: &Path) -> PathBuf {
        music_dir.join(self.music_file_name())
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Relaxing
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narration plus background music, both fitted to `total_duration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioMix {
    pub voice_track: PathBuf,
    pub background_track: PathBuf,
    pub voice_gain: f64,
    pub background_gain: f64,
    pub total_duration: f64,
    pub background_fit: DurationFit,
}

impl AudioMix {
    pub fn new(
        voice_track: PathBuf,
        background_track: PathBuf,
        background_duration: f64,
        total_duration: f64,
    ) -> Result<Self, TimelineError> {
        let background_fit = DurationFit::plan(background_duration, total_duration)?;
        Ok(AudioMix {
            voice_track,
            background_track,
            voice_gain: VOICE_GAIN,
            background_gain: BACKGROUND_GAIN,
            total_duration,
            background_fit,
        })
    }
}
