use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when comparing second offsets produced by float arithmetic.
pub const TIME_EPSILON: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("caption {index} has non-positive length ({start}..{end})")]
    EmptyRange { index: usize, start: f64, end: f64 },
    #[error("caption {index} starts before the previous caption ends ({start} < {previous_end})")]
    Overlap {
        index: usize,
        start: f64,
        previous_end: f64,
    },
    #[error("caption {index} has a negative start ({start})")]
    NegativeStart { index: usize, start: f64 },
    #[error("{0} requires at least one input")]
    NoInput(&'static str),
    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        TimeRange { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub time_range: TimeRange,
    pub text: String,
}

impl Caption {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Caption {
            time_range: TimeRange::new(start, end),
            text: text.into(),
        }
    }
}

/// One search window of the narration timeline. `keywords == None` marks a
/// window whose keyword lookup produced nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub time_range: TimeRange,
    pub keywords: Option<Vec<String>>,
}

impl Window {
    /// The keyword used for asset search. Always the first one.
    pub fn primary_keyword(&self) -> Option<&str> {
        self.keywords
            .as_ref()
            .and_then(|k| k.first())
            .map(|s| s.as_str())
    }

    pub fn is_resolvable(&self) -> bool {
        self.primary_keyword().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: i32,
    pub height: i32,
}

/// A window after its asset has been downloaded and fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSegment {
    pub time_range: TimeRange,
    pub asset_path: String,
    pub source_duration: f64,
    pub source_resolution: Resolution,
}

impl ResolvedSegment {
    /// Duration the segment occupies after fitting.
    pub fn fitted_duration(&self) -> f64 {
        self.time_range.duration()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub resolution: Resolution,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u32,
    pub threads: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            resolution: Resolution {
                width: 1080,
                height: 1920,
            },
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            threads: 4,
        }
    }
}

/// Checks that captions are ordered, non-overlapping and have positive length.
pub fn validate_captions(captions: &[Caption]) -> Result<(), TimelineError> {
    let mut previous_end: Option<f64> = None;
    for (index, caption) in captions.iter().enumerate() {
        let TimeRange { start, end } = caption.time_range;
        if start < 0.0 {
            return Err(TimelineError::NegativeStart { index, start });
        }
        if end <= start {
            return Err(TimelineError::EmptyRange { index, start, end });
        }
        if let Some(previous_end) = previous_end {
            if start + TIME_EPSILON < previous_end {
                return Err(TimelineError::Overlap {
                    index,
                    start,
                    previous_end,
                });
            }
        }
        previous_end = Some(end);
    }
    Ok(())
}

/// True when each range starts exactly where the previous one ended.
pub fn is_contiguous(ranges: &[TimeRange]) -> bool {
    ranges
        .windows(2)
        .all(|pair| (pair[1].start - pair[0].end).abs() < TIME_EPSILON)
}

/// Sum of the fitted durations of all segments.
pub fn total_fitted_duration(segments: &[ResolvedSegment]) -> f64 {
    segments.iter().map(|s| s.fitted_duration()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlapping_captions() {
        let captions = vec![Caption::new(0.0, 2.0, "a"), Caption::new(1.5, 3.0, "b")];
        assert_eq!(
            validate_captions(&captions),
            Err(TimelineError::Overlap {
                index: 1,
                start: 1.5,
                previous_end: 2.0
            })
        );
    }

    #[test]
    fn rejects_zero_length_caption() {
        let captions = vec![Caption::new(1.0, 1.0, "a")];
        assert!(matches!(
            validate_captions(&captions),
            Err(TimelineError::EmptyRange { index: 0, .. })
        ));
    }

    #[test]
    fn window_uses_first_keyword() {
        let window = Window {
            time_range: TimeRange::new(0.0, 4.0),
            keywords: Some(vec!["city rain".into(), "umbrella".into()]),
        };
        assert_eq!(window.primary_keyword(), Some("city rain"));

        let empty = Window {
            time_range: TimeRange::new(0.0, 4.0),
            keywords: Some(Vec::new()),
        };
        assert!(!empty.is_resolvable());
    }

    #[test]
    fn contiguity_check() {
        let ranges = [TimeRange::new(0.0, 4.0), TimeRange::new(4.0, 9.0)];
        assert!(is_contiguous(&ranges));
        let gapped = [TimeRange::new(0.0, 4.0), TimeRange::new(5.0, 9.0)];
        assert!(!is_contiguous(&gapped));
    }
}
