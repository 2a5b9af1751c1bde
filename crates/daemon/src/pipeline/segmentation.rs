use tracing::{debug, warn};

use engine::segmenter::segment_captions;
use engine::{Caption, Window};

use crate::pipeline::{RenderFailure, Stage, StageExt};
use crate::services::KeywordService;

/// Splits the transcript into windows and asks for keywords one window at a
/// time, in timeline order. A failed lookup leaves that window without
/// keywords instead of failing the render.
pub async fn build_windows(
    captions: &[Caption],
    segment_seconds: f64,
    keywords: &dyn KeywordService,
) -> Result<Vec<Window>, RenderFailure> {
    let drafts = segment_captions(captions, segment_seconds).stage(Stage::Segmentation)?;

    let mut windows = Vec::with_capacity(drafts.len());
    for (index, draft) in drafts.into_iter().enumerate() {
        let found = match keywords.infer_keywords(&draft.text).await {
            Ok(found) => found,
            Err(e) => {
                warn!(window = index, error = %format!("{:#}", e), "keyword lookup failed");
                None
            }
        };
        debug!(
            window = index,
            start = draft.time_range.start,
            end = draft.time_range.end,
            keywords = ?found,
            "window segmented"
        );
        windows.push(draft.into_window(found));
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::EchoKeywords;
    use anyhow::Result;
    use async_trait::async_trait;
    use engine::TimeRange;

    struct FailingKeywords;

    #[async_trait]
    impl KeywordService for FailingKeywords {
        async fn infer_keywords(&self, _text: &str) -> Result<Option<Vec<String>>> {
            anyhow::bail!("rate limited")
        }
    }

    #[tokio::test]
    async fn lookups_follow_timeline_order() {
        let captions = vec![
            Caption::new(0.0, 2.0, "a"),
            Caption::new(2.0, 5.0, "b"),
            Caption::new(5.0, 9.0, "c"),
        ];
        let keywords = EchoKeywords::default();
        let windows = build_windows(&captions, 4.0, &keywords).await.unwrap();

        assert_eq!(*keywords.requests.lock().unwrap(), vec!["a b", "c"]);
        assert_eq!(windows[0].time_range, TimeRange::new(0.0, 4.0));
        assert_eq!(windows[1].time_range, TimeRange::new(4.0, 9.0));
        assert_eq!(windows[1].primary_keyword(), Some("c"));
    }

    #[tokio::test]
    async fn failed_lookup_leaves_window_empty() {
        let captions = vec![Caption::new(0.0, 3.0, "a")];
        let windows = build_windows(&captions, 4.0, &FailingKeywords).await.unwrap();
        assert_eq!(windows.len(), 1);
        assert!(!windows[0].is_resolvable());
    }

    #[tokio::test]
    async fn bad_segment_length_is_a_segmentation_failure() {
        let captions = vec![Caption::new(0.0, 3.0, "a")];
        let failure = build_windows(&captions, -1.0, &FailingKeywords)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Segmentation);
    }
}
