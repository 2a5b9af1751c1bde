use std::path::{Path, PathBuf};

use crate::audio::AudioMix;
use crate::captions::{drawtext_filter, CaptionOverlay, CaptionStyle};
use crate::fit::{DurationFit, ScaleFit};
use crate::timeline::{RenderSettings, TimelineError};

pub struct RenderCommand {
    pub ffmpeg_args: Vec<String>,
    pub output_path: PathBuf,
    pub concat_list_path: Option<PathBuf>, // Path to concat demuxer list file
}

fn secs(value: f64) -> String {
    format!("{:.6}", value)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn video_encoder_args(settings: &RenderSettings) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-crf".to_string(),
        settings.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ]
}

/// Loop-or-trim one downloaded asset to its window length and stretch it to
/// the output frame. Audio from the stock clip is discarded.
pub fn fit_segment_command(
    input: &Path,
    output: &Path,
    duration: &DurationFit,
    scale: &ScaleFit,
    settings: &RenderSettings,
) -> RenderCommand {
    let mut args = vec![
        "-stream_loop".to_string(),
        duration.extra_loops().to_string(),
        "-i".to_string(),
        path_arg(input),
        "-t".to_string(),
        secs(duration.trim_to),
        "-vf".to_string(),
        format!("{},fps={}", scale.filter(), settings.fps),
        "-an".to_string(),
    ];
    args.extend(video_encoder_args(settings));
    args.push("-y".to_string());
    args.push(path_arg(output));

    RenderCommand {
        ffmpeg_args: args,
        output_path: output.to_path_buf(),
        concat_list_path: None,
    }
}

/// Body of an ffmpeg concat-demuxer list file.
pub fn concat_list_body(segment_paths: &[PathBuf]) -> String {
    segment_paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

/// Joins already-normalised segments without re-encoding.
pub fn concat_command(
    concat_list_path: &Path,
    output: &Path,
    segment_count: usize,
) -> Result<RenderCommand, TimelineError> {
    if segment_count == 0 {
        return Err(TimelineError::NoInput("concatenation"));
    }
    let args = vec![
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        path_arg(concat_list_path),
        "-c".to_string(),
        "copy".to_string(),
        "-y".to_string(),
        path_arg(output),
    ];
    Ok(RenderCommand {
        ffmpeg_args: args,
        output_path: output.to_path_buf(),
        concat_list_path: Some(concat_list_path.to_path_buf()),
    })
}

/// Voice and looped/trimmed music summed at their fixed gains into a PCM
/// track of exactly `mix.total_duration` seconds.
pub fn mix_audio_command(mix: &AudioMix, output: &Path) -> RenderCommand {
    let total = secs(mix.total_duration);
    let filter = format!(
        "[0:a]volume={voice_gain},apad=whole_dur={total}[voice];\
         [1:a]volume={music_gain},atrim=0:{total},asetpts=PTS-STARTPTS[music];\
         [voice][music]amix=inputs=2:duration=first:dropout_transition=0:normalize=0,atrim=0:{total}[mix]",
        voice_gain = mix.voice_gain,
        music_gain = mix.background_gain,
        total = total,
    );

    let args = vec![
        "-i".to_string(),
        path_arg(&mix.voice_track),
        "-stream_loop".to_string(),
        mix.background_fit.extra_loops().to_string(),
        "-i".to_string(),
        path_arg(&mix.background_track),
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[mix]".to_string(),
        "-t".to_string(),
        total,
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-y".to_string(),
        path_arg(output),
    ];

    RenderCommand {
        ffmpeg_args: args,
        output_path: output.to_path_buf(),
        concat_list_path: None,
    }
}

pub struct CompositionInputs<'a> {
    pub background: &'a Path,
    /// Fit of the concatenated background against the narration length.
    pub background_fit: DurationFit,
    pub mixed_audio: &'a Path,
    pub overlays: &'a [CaptionOverlay],
    pub style: &'a CaptionStyle,
    pub settings: &'a RenderSettings,
}

/// Final encode: background looped or trimmed to the narration length,
/// caption overlays burned in, mixed audio bound as the only audio stream.
pub fn compose_command(inputs: &CompositionInputs<'_>, output: &Path) -> RenderCommand {
    let total = secs(inputs.background_fit.trim_to);
    let frame = inputs.settings.resolution;

    let mut video_chain = vec![format!("trim=duration={}", total), "setpts=PTS-STARTPTS".to_string()];
    for overlay in inputs.overlays {
        video_chain.push(drawtext_filter(overlay, inputs.style, frame));
    }
    let filter = format!("[0:v]{}[outv]", video_chain.join(","));

    let mut args = vec![
        "-stream_loop".to_string(),
        inputs.background_fit.extra_loops().to_string(),
        "-i".to_string(),
        path_arg(inputs.background),
        "-i".to_string(),
        path_arg(inputs.mixed_audio),
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[outv]".to_string(),
        "-map".to_string(),
        "1:a".to_string(),
        "-t".to_string(),
        total,
        "-r".to_string(),
        inputs.settings.fps.to_string(),
    ];
    args.extend(video_encoder_args(inputs.settings));
    args.extend([
        "-c:a".to_string(),
        inputs.settings.audio_codec.clone(),
        "-b:a".to_string(),
        "128k".to_string(),
        "-threads".to_string(),
        inputs.settings.threads.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-f".to_string(),
        "mp4".to_string(),
        "-y".to_string(),
        path_arg(output),
    ]);

    RenderCommand {
        ffmpeg_args: args,
        output_path: output.to_path_buf(),
        concat_list_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Resolution;

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn concat_list_quotes_paths() {
        let body = concat_list_body(&[PathBuf::from("/s/seg_0.mp4"), PathBuf::from("/s/it's.mp4")]);
        assert_eq!(body, "file '/s/seg_0.mp4'\nfile '/s/it'\\''s.mp4'\n");
    }

    #[test]
    fn concat_requires_segments() {
        assert!(concat_command(Path::new("l.txt"), Path::new("o.mp4"), 0).is_err());
    }

    #[test]
    fn fit_command_loops_before_input() {
        let settings = RenderSettings::default();
        let fit = DurationFit::plan(3.0, 6.0).unwrap();
        let scale = ScaleFit::new(
            Resolution {
                width: 640,
                height: 360,
            },
            settings.resolution,
        );
        let cmd = fit_segment_command(Path::new("raw.mp4"), Path::new("seg.mp4"), &fit, &scale, &settings);
        let args = &cmd.ffmpeg_args;
        assert_eq!(args[0], "-stream_loop");
        assert_eq!(args[1], "1");
        assert_eq!(arg_after(args, "-t"), Some("6.000000"));
        assert_eq!(arg_after(args, "-vf"), Some("scale=1080:1920,setsar=1,fps=30"));
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last().map(|s| s.as_str()), Some("seg.mp4"));
    }
}
