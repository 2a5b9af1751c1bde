use serde::{Deserialize, Serialize};

use crate::timeline::{Caption, TimeRange, TimelineError, Window, TIME_EPSILON};

/// Nominal window length in seconds.
pub const DEFAULT_SEGMENT_SECONDS: f64 = 4.0;

/// A window whose caption text has been gathered but whose keywords have not
/// been looked up yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDraft {
    pub time_range: TimeRange,
    pub text: String,
}

impl WindowDraft {
    /// Attaches the keyword lookup result. An empty or all-blank list is
    /// stored as `None`.
    pub fn into_window(self, keywords: Option<Vec<String>>) -> Window {
        let keywords = keywords
            .map(|list| {
                list.into_iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty());
        Window {
            time_range: self.time_range,
            keywords,
        }
    }
}

/// Groups captions into windows of nominal length `segment_seconds`.
///
/// Windows tile `[captions[0].start, captions[last].end]` without gaps: a
/// window closes when a caption starts at or after its end, and the next
/// window begins where the closed one ended and extends `segment_seconds`
/// past the triggering caption's start (capped at the transcript end). The
/// final window always ends at the last caption's true end.
pub fn segment_captions(
    captions: &[Caption],
    segment_seconds: f64,
) -> Result<Vec<WindowDraft>, TimelineError> {
    if segment_seconds <= 0.0 {
        return Err(TimelineError::NonPositiveDuration(segment_seconds));
    }
    let (first, last) = match (captions.first(), captions.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(Vec::new()),
    };

    let total_end = last.time_range.end;
    let mut current_start = first.time_range.start;
    let mut current_end = (current_start + segment_seconds).min(total_end);
    let mut buffer: Vec<&str> = Vec::new();
    let mut drafts = Vec::new();

    for (index, caption) in captions.iter().enumerate() {
        let start = caption.time_range.start;

        if !buffer.is_empty() && start + TIME_EPSILON >= current_end {
            drafts.push(WindowDraft {
                time_range: TimeRange::new(current_start, current_end),
                text: buffer.join(" "),
            });
            buffer.clear();
            current_start = current_end;
            current_end = (start + segment_seconds).min(total_end);
        }

        buffer.push(caption.text.trim());

        if index == captions.len() - 1 {
            drafts.push(WindowDraft {
                time_range: TimeRange::new(current_start, caption.time_range.end),
                text: buffer.join(" "),
            });
        }
    }

    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transcript_yields_no_windows() {
        assert!(segment_captions(&[], 4.0).unwrap().is_empty());
    }

    #[test]
    fn long_single_caption_is_not_split() {
        let drafts = segment_captions(&[Caption::new(0.0, 11.0, "long")], 4.0).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].time_range, TimeRange::new(0.0, 11.0));
    }

    #[test]
    fn rejects_non_positive_length() {
        assert_eq!(
            segment_captions(&[Caption::new(0.0, 1.0, "a")], 0.0),
            Err(TimelineError::NonPositiveDuration(0.0))
        );
    }

    #[test]
    fn blank_keywords_become_none() {
        let draft = WindowDraft {
            time_range: TimeRange::new(0.0, 4.0),
            text: "x".into(),
        };
        let window = draft.clone().into_window(Some(vec!["  ".into()]));
        assert_eq!(window.keywords, None);
        let window = draft.into_window(Some(vec![" sunset beach ".into()]));
        assert_eq!(window.keywords, Some(vec!["sunset beach".to_string()]));
    }

    #[test]
    fn silence_is_absorbed_by_following_window() {
        let captions = vec![
            Caption::new(0.0, 1.0, "a"),
            Caption::new(10.0, 12.0, "b"),
            Caption::new(12.0, 13.0, "c"),
        ];
        let drafts = segment_captions(&captions, 4.0).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].time_range, TimeRange::new(0.0, 4.0));
        assert_eq!(drafts[1].time_range, TimeRange::new(4.0, 13.0));
        assert_eq!(drafts[1].text, "b c");
    }
}
