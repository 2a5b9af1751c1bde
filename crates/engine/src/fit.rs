use serde::{Deserialize, Serialize};

use crate::timeline::{Resolution, TimelineError, TIME_EPSILON};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStrategy {
    /// Source already matches the target length.
    Exact,
    /// Source is longer; keep the head and cut the tail.
    Trim,
    /// Source is shorter; repeat it and cut the last repetition.
    Loop,
}

/// How to turn a source of one length into exactly `trim_to` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationFit {
    pub source_duration: f64,
    /// Total number of times the source is played back to back.
    pub loops: u32,
    pub trim_to: f64,
}

impl DurationFit {
    pub fn plan(source_duration: f64, target_duration: f64) -> Result<Self, TimelineError> {
        if source_duration <= 0.0 {
            return Err(TimelineError::NonPositiveDuration(source_duration));
        }
        if target_duration <= 0.0 {
            return Err(TimelineError::NonPositiveDuration(target_duration));
        }

        let loops = if source_duration + TIME_EPSILON >= target_duration {
            1
        } else {
            ((target_duration - TIME_EPSILON) / source_duration).ceil() as u32
        };

        Ok(DurationFit {
            source_duration,
            loops: loops.max(1),
            trim_to: target_duration,
        })
    }

    /// Repetitions after the first play, as ffmpeg's `-stream_loop` expects.
    pub fn extra_loops(&self) -> u32 {
        self.loops - 1
    }

    /// Length of the looped source before the trim.
    pub fn covered_duration(&self) -> f64 {
        self.source_duration * self.loops as f64
    }

    pub fn strategy(&self) -> FitStrategy {
        if self.loops > 1 {
            FitStrategy::Loop
        } else if (self.source_duration - self.trim_to).abs() < TIME_EPSILON {
            FitStrategy::Exact
        } else {
            FitStrategy::Trim
        }
    }
}

/// Stretches a source frame to the target size. Aspect ratio is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFit {
    pub source: Resolution,
    pub target: Resolution,
}

impl ScaleFit {
    pub fn new(source: Resolution, target: Resolution) -> Self {
        ScaleFit { source, target }
    }

    pub fn filter(&self) -> String {
        format!(
            "scale={}:{},setsar=1",
            self.target.width, self.target.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_source_is_trimmed_from_start() {
        let fit = DurationFit::plan(12.5, 4.0).unwrap();
        assert_eq!(fit.loops, 1);
        assert_eq!(fit.extra_loops(), 0);
        assert_eq!(fit.trim_to, 4.0);
        assert_eq!(fit.strategy(), FitStrategy::Trim);
    }

    #[test]
    fn equal_source_is_exact() {
        let fit = DurationFit::plan(4.0, 4.0).unwrap();
        assert_eq!(fit.strategy(), FitStrategy::Exact);
    }

    #[test]
    fn shorter_source_loops_until_covered() {
        let fit = DurationFit::plan(2.5, 6.0).unwrap();
        assert_eq!(fit.loops, 3);
        assert!(fit.covered_duration() >= 6.0);
        assert_eq!(fit.strategy(), FitStrategy::Loop);
    }

    #[test]
    fn rejects_empty_source() {
        assert!(DurationFit::plan(0.0, 4.0).is_err());
    }

    #[test]
    fn scale_ignores_aspect_ratio() {
        let target = Resolution {
            width: 1080,
            height: 1920,
        };
        let fit = ScaleFit::new(
            Resolution {
                width: 1920,
                height: 1080,
            },
            target,
        );
        assert_eq!(fit.filter(), "scale=1080:1920,setsar=1");
    }
}
