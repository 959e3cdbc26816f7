/*!
 * ffprobe/ffmpeg subprocess collaborators.
 *
 * `FfprobeProbe` validates background clips, `FfmpegEncoder` turns a sorted
 * timeline into the final file. Argument construction is kept in pure
 * functions so the filtergraph can be tested without ffmpeg installed.
 */

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::errors::{EncodeError, FootageError};
use crate::providers::{ClipInfo, EncodeSettings, Encoder, FootageProbe};
use crate::timeline::{CaptionOverlay, CaptionRegion, FrameSize, Timeline, TimelineSegment, VisualSource};

/// Lines of encoder stderr kept in an error
const STDERR_TAIL_LINES: usize = 20;

/// Padding between a caption box and its text, in pixels
const CAPTION_BOX_BORDER: u32 = 12;

/// Probes clips with `ffprobe`, decoding the first video frame
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_read_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Interpret ffprobe's JSON report
pub fn parse_probe_output(json: &str) -> Result<ClipInfo, String> {
    let output: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("unreadable ffprobe output: {}", e))?;

    let stream = output
        .streams
        .first()
        .ok_or_else(|| "no video stream".to_string())?;

    let duration = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let frames_read = stream
        .nb_read_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .unwrap_or(0);

    Ok(ClipInfo {
        duration,
        frame_size: FrameSize {
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
        },
        first_frame_readable: frames_read > 0,
    })
}

impl FootageProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<ClipInfo, FootageError> {
        let output = std::process::Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_frames",
                "-read_intervals",
                "%+#1",
                "-show_entries",
                "stream=width,height,nb_read_frames:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| FootageError::Probe {
                path: path.to_path_buf(),
                message: format!("failed to run {:?}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(FootageError::Probe {
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout)).map_err(|message| {
            FootageError::Probe {
                path: path.to_path_buf(),
                message,
            }
        })?;

        debug!(
            "Probed {:?}: {:.3}s, {}, first frame {}",
            path,
            info.duration,
            info.frame_size,
            if info.first_frame_readable { "ok" } else { "unreadable" }
        );
        Ok(info)
    }
}

/// Encodes a timeline by running `ffmpeg`
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        timeline: &Timeline,
        output: &Path,
        settings: &EncodeSettings,
    ) -> Result<(), EncodeError> {
        let args = build_ffmpeg_args(timeline, output, settings)?;
        info!(
            "Encoding {} segments ({:.2}s) to {:?}",
            timeline.segments.len(),
            timeline.total_duration(),
            output
        );
        debug!("ffmpeg {}", args.join(" "));

        let result = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EncodeError::Spawn {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })?;

        if !result.status.success() {
            return Err(EncodeError::Failed {
                status: result.status.to_string(),
                stderr: stderr_tail(&String::from_utf8_lossy(&result.stderr), STDERR_TAIL_LINES),
            });
        }

        Ok(())
    }
}

/// Build the complete ffmpeg command line for `timeline`.
///
/// Every segment contributes one video input and one audio input. Footage
/// captions are drawn on the clip's native frame before it is scaled and
/// cropped to the output size; still captions are laid out for the output
/// frame and drawn after the crop. The segments are joined with `concat`.
pub fn build_ffmpeg_args(
    timeline: &Timeline,
    output: &Path,
    settings: &EncodeSettings,
) -> Result<Vec<String>, EncodeError> {
    if timeline.segments.is_empty() {
        return Err(EncodeError::InvalidTimeline("timeline has no segments".to_string()));
    }
    timeline.check_contiguous().map_err(EncodeError::InvalidTimeline)?;

    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut filters: Vec<String> = Vec::new();
    let mut concat_inputs = String::new();
    let mut next_input = 0usize;

    for (position, segment) in timeline.segments.iter().enumerate() {
        if !segment.duration.is_finite() || segment.duration <= 0.0 {
            return Err(EncodeError::InvalidTimeline(format!(
                "segment {} has duration {:.3}s",
                segment.index, segment.duration
            )));
        }

        let video_input = next_input;
        push_video_input(&mut args, segment, settings);
        let audio_input = video_input + 1;
        push_audio_input(&mut args, segment, settings);
        next_input += 2;

        filters.push(video_filter(video_input, position, segment, settings));
        filters.push(audio_filter(audio_input, position, segment, settings));
        concat_inputs.push_str(&format!("[v{position}][a{position}]"));
    }

    filters.push(format!(
        "{concat_inputs}concat=n={}:v=1:a=1[vout][aout]",
        timeline.segments.len()
    ));

    args.push("-filter_complex".to_string());
    args.push(filters.join(";"));
    args.extend(
        [
            "-map",
            "[vout]",
            "-map",
            "[aout]",
            "-c:v",
            settings.video_codec.as_str(),
            "-preset",
            settings.preset.as_str(),
            "-pix_fmt",
            "yuv420p",
            "-r",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(settings.fps.to_string());
    args.push("-c:a".to_string());
    args.push(settings.audio_codec.clone());
    args.push("-ar".to_string());
    args.push(settings.audio_sample_rate.to_string());
    args.push("-movflags".to_string());
    args.push("+faststart".to_string());
    args.push(output.to_string_lossy().into_owned());

    Ok(args)
}

fn push_video_input(args: &mut Vec<String>, segment: &TimelineSegment, settings: &EncodeSettings) {
    let duration = format_time(segment.duration);
    match &segment.visual {
        VisualSource::Footage(window) => {
            if window.loop_count > 1 {
                args.push("-stream_loop".to_string());
                args.push((window.loop_count - 1).to_string());
            }
            args.push("-ss".to_string());
            args.push(format_time(window.start));
            args.push("-t".to_string());
            args.push(duration);
            args.push("-i".to_string());
            args.push(window.source.to_string_lossy().into_owned());
        }
        VisualSource::Still { image: Some(image), .. } => {
            args.extend(["-loop", "1", "-t"].iter().map(|s| s.to_string()));
            args.push(duration);
            args.push("-i".to_string());
            args.push(image.to_string_lossy().into_owned());
        }
        VisualSource::Still { image: None, color } => {
            args.extend(["-f", "lavfi", "-t"].iter().map(|s| s.to_string()));
            args.push(duration);
            args.push("-i".to_string());
            args.push(format!(
                "color=c={}:s={}x{}:r={}",
                color, settings.frame_size.width, settings.frame_size.height, settings.fps
            ));
        }
    }
}

fn push_audio_input(args: &mut Vec<String>, segment: &TimelineSegment, settings: &EncodeSettings) {
    match &segment.audio {
        Some(audio) => {
            args.push("-i".to_string());
            args.push(audio.path.to_string_lossy().into_owned());
        }
        None => {
            args.extend(["-f", "lavfi", "-t"].iter().map(|s| s.to_string()));
            args.push(format_time(segment.duration));
            args.push("-i".to_string());
            args.push(format!(
                "anullsrc=r={}:cl=stereo",
                settings.audio_sample_rate
            ));
        }
    }
}

fn video_filter(input: usize, position: usize, segment: &TimelineSegment, settings: &EncodeSettings) -> String {
    let FrameSize { width, height } = settings.frame_size;
    let mut chain: Vec<String> = Vec::new();

    let captions = segment.caption.as_ref().map(drawtext_filters).unwrap_or_default();
    let on_output_frame = matches!(segment.visual, VisualSource::Still { .. });

    if !on_output_frame {
        chain.extend(captions.iter().cloned());
    }
    chain.push(format!(
        "scale={width}:{height}:force_original_aspect_ratio=increase"
    ));
    chain.push(format!("crop={width}:{height}"));
    if on_output_frame {
        chain.extend(captions);
    }
    chain.push(format!("fps={}", settings.fps));
    chain.push("setsar=1".to_string());
    chain.push(format!("trim=duration={}", format_time(segment.duration)));
    chain.push("setpts=PTS-STARTPTS".to_string());

    format!("[{input}:v]{}[v{position}]", chain.join(","))
}

fn audio_filter(input: usize, position: usize, segment: &TimelineSegment, settings: &EncodeSettings) -> String {
    format!(
        "[{input}:a]aformat=sample_rates={}:channel_layouts=stereo,apad,atrim=duration={},asetpts=PTS-STARTPTS[a{position}]",
        settings.audio_sample_rate,
        format_time(segment.duration)
    )
}

/// One `drawtext` filter per cue, enabled only inside the cue's time range.
///
/// Ranges are half-open so adjacent cues never share a frame; the last cue
/// keeps its end frame. Text files are drawn verbatim (`expansion=none`).
pub fn drawtext_filters(caption: &CaptionOverlay) -> Vec<String> {
    let margin = (f64::from(caption.frame_size.height) * 0.08).round() as u32;
    let y = match caption.region {
        CaptionRegion::Top => format!("{margin}"),
        CaptionRegion::Center => "(h-text_h)/2".to_string(),
        CaptionRegion::Bottom => format!("h-text_h-{margin}"),
    };

    let last = caption.cues.len().saturating_sub(1);

    caption
        .cues
        .iter()
        .enumerate()
        .filter_map(|(position, cue)| {
            let asset = cue.asset.as_ref()?;
            let mut filter = format!(
                "drawtext=textfile='{}':expansion=none",
                escape_ffmpeg_path(asset)
            );
            if let Some(font) = &caption.font_file {
                filter.push_str(&format!(":fontfile='{}'", escape_ffmpeg_path(font)));
            }
            filter.push_str(&format!(
                ":fontsize={}:fontcolor={}@{:.2}:box=1:boxcolor={}@{:.2}:boxborderw={}:line_spacing=8",
                caption.font_size,
                caption.font_color,
                caption.opacity,
                caption.box_color,
                caption.opacity * 0.6,
                CAPTION_BOX_BORDER
            ));
            let (start, end) = (format_time(cue.start), format_time(cue.end));
            let enable = if position == last {
                format!("between(t,{start},{end})")
            } else {
                format!("gte(t,{start})*lt(t,{end})")
            };
            filter.push_str(&format!(":x=(w-text_w)/2:y={}:enable='{}'", y, enable));
            Some(filter)
        })
        .collect()
}

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

pub fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

fn stderr_tail(stderr: &str, lines: usize) -> String {
    let collected: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = collected.len().saturating_sub(lines);
    collected[skip..].join("\n")
}
