use engine::audio::{AudioMix, Theme};
use engine::fit::{DurationFit, FitStrategy, ScaleFit};
use engine::merger::merge_empty_intervals;
use engine::render::{compose_command, mix_audio_command, CompositionInputs};
use engine::segmenter::{segment_captions, DEFAULT_SEGMENT_SECONDS};
use engine::captions::{CaptionOverlay, CaptionStyle};
use engine::{is_contiguous, Caption, RenderSettings, Resolution, TimeRange, Window, TIME_EPSILON};
use std::path::{Path, PathBuf};

fn captions(rows: &[(f64, f64, &str)]) -> Vec<Caption> {
    rows.iter().map(|(s, e, t)| Caption::new(*s, *e, *t)).collect()
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

#[test]
fn last_window_absorbs_final_caption() {
    let input = captions(&[(0.0, 2.0, "a"), (2.0, 5.0, "b"), (5.0, 9.0, "c")]);
    let drafts = segment_captions(&input, DEFAULT_SEGMENT_SECONDS).unwrap();

    let ranges: Vec<TimeRange> = drafts.iter().map(|d| d.time_range).collect();
    assert_eq!(ranges, vec![TimeRange::new(0.0, 4.0), TimeRange::new(4.0, 9.0)]);
    assert_eq!(drafts[0].text, "a b");
    assert_eq!(drafts[1].text, "c");
}

#[test]
fn windows_tile_the_transcript() {
    let input = captions(&[
        (0.4, 1.1, "one"),
        (1.1, 2.9, "two"),
        (3.0, 4.7, "three"),
        (4.7, 6.2, "four"),
        (7.5, 8.0, "five"),
        (8.0, 12.3, "six"),
        (12.3, 12.9, "seven"),
    ]);
    for segment_seconds in [1.0, 2.5, 4.0, 10.0] {
        let drafts = segment_captions(&input, segment_seconds).unwrap();
        let ranges: Vec<TimeRange> = drafts.iter().map(|d| d.time_range).collect();

        assert!(is_contiguous(&ranges), "gap or overlap for L={segment_seconds}");
        assert_eq!(ranges.first().unwrap().start, 0.4);
        assert_eq!(ranges.last().unwrap().end, 12.9);
        assert!(ranges.iter().all(|r| r.duration() > 0.0));

        let words: usize = drafts.iter().map(|d| d.text.split_whitespace().count()).sum();
        assert_eq!(words, input.len());
    }
}

#[test]
fn last_window_is_not_truncated_to_nominal_end() {
    let input = captions(&[(0.0, 3.9, "a"), (4.0, 4.5, "b"), (4.5, 10.0, "c")]);
    let drafts = segment_captions(&input, 4.0).unwrap();
    assert_eq!(drafts.last().unwrap().time_range.end, 10.0);
}

#[test]
fn merge_preserves_order_and_never_grows() {
    let windows = vec![
        Window {
            time_range: TimeRange::new(0.0, 4.0),
            keywords: None,
        },
        Window {
            time_range: TimeRange::new(4.0, 8.0),
            keywords: Some(vec!["desert".into()]),
        },
        Window {
            time_range: TimeRange::new(8.0, 9.0),
            keywords: Some(vec!["camel".into()]),
        },
    ];
    let merged = merge_empty_intervals(windows.clone());
    assert!(merged.len() <= windows.len());
    assert_eq!(merged, windows[1..].to_vec());
}

#[test]
fn six_second_window_from_three_second_asset() {
    let fit = DurationFit::plan(3.0, 6.0).unwrap();
    assert_eq!(fit.loops, 2);
    assert_eq!(fit.strategy(), FitStrategy::Loop);
    assert!((fit.trim_to - 6.0).abs() < TIME_EPSILON);
}

#[test]
fn fitted_length_matches_window_for_any_asset_length() {
    for (asset, window) in [(0.7, 4.0), (4.0, 4.0), (19.2, 3.3), (1.0, 1.0001), (2.0, 8.0)] {
        let fit = DurationFit::plan(asset, window).unwrap();
        assert!((fit.trim_to - window).abs() < TIME_EPSILON);
        assert!(fit.covered_duration() + TIME_EPSILON >= window);
        assert!(fit.covered_duration() - asset < window, "looped too many times");
    }
}

#[test]
fn every_source_shape_scales_to_the_target_frame() {
    let target = RenderSettings::default().resolution;
    for (w, h) in [(1920, 1080), (1080, 1920), (720, 720), (3840, 2160)] {
        let fit = ScaleFit::new(Resolution { width: w, height: h }, target);
        assert_eq!(fit.filter(), "scale=1080:1920,setsar=1");
    }
}

#[test]
fn fallback_theme_maps_to_relaxing_track() {
    assert_eq!(
        Theme::default().music_path(Path::new("music")),
        PathBuf::from("music/relaxing.mp3")
    );
}

#[test]
fn mixed_audio_is_cut_to_narration_length() {
    for music_len in [5.0, 60.0] {
        let mix = AudioMix::new("voice.wav".into(), "music.mp3".into(), music_len, 17.25).unwrap();
        let cmd = mix_audio_command(&mix, Path::new("mix.wav"));
        assert_eq!(arg_after(&cmd.ffmpeg_args, "-t"), Some("17.250000"));
        assert!(mix.background_fit.covered_duration() >= 17.25);
    }
}

#[test]
fn composition_loops_short_background_to_narration_length() {
    let settings = RenderSettings::default();
    let style = CaptionStyle::default();
    let overlays = vec![
        CaptionOverlay {
            time_range: TimeRange::new(0.0, 1.2),
            text_file: PathBuf::from("/tmp/c0.txt"),
        },
        CaptionOverlay {
            time_range: TimeRange::new(1.2, 2.0),
            text_file: PathBuf::from("/tmp/c1.txt"),
        },
    ];
    // 8 s of background left after dropping a window, 12 s of narration.
    let inputs = CompositionInputs {
        background: Path::new("bg.mp4"),
        background_fit: DurationFit::plan(8.0, 12.0).unwrap(),
        mixed_audio: Path::new("mix.wav"),
        overlays: &overlays,
        style: &style,
        settings: &settings,
    };
    let cmd = compose_command(&inputs, Path::new("out.mp4.partial"));
    let args = &cmd.ffmpeg_args;

    assert_eq!(arg_after(args, "-stream_loop"), Some("1"));
    assert_eq!(arg_after(args, "-t"), Some("12.000000"));
    assert_eq!(arg_after(args, "-r"), Some("30"));
    assert_eq!(arg_after(args, "-c:v"), Some("libx264"));
    assert_eq!(arg_after(args, "-f"), Some("mp4"));
    let filter = arg_after(args, "-filter_complex").unwrap();
    assert_eq!(filter.matches("drawtext=").count(), overlays.len());
    assert!(filter.starts_with("[0:v]trim=duration=12.000000,"));
}

#[test]
fn composition_trims_long_background_to_narration_length() {
    let settings = RenderSettings::default();
    let style = CaptionStyle::default();
    // Segments add up to 14 s but the narration is only 9 s.
    let inputs = CompositionInputs {
        background: Path::new("bg.mp4"),
        background_fit: DurationFit::plan(14.0, 9.0).unwrap(),
        mixed_audio: Path::new("mix.wav"),
        overlays: &[],
        style: &style,
        settings: &settings,
    };
    let cmd = compose_command(&inputs, Path::new("out.mp4.partial"));
    let args = &cmd.ffmpeg_args;

    assert_eq!(inputs.background_fit.strategy(), FitStrategy::Trim);
    assert_eq!(arg_after(args, "-stream_loop"), Some("0"));
    assert_eq!(arg_after(args, "-t"), Some("9.000000"));
    let filter = arg_after(args, "-filter_complex").unwrap();
    assert!(filter.starts_with("[0:v]trim=duration=9.000000,"));
}
