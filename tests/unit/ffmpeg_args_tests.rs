/*!
 * Tests for the ffmpeg command line built from a timeline
 */

use std::path::{Path, PathBuf};

use textreel::errors::EncodeError;
use textreel::footage::FootageWindow;
use textreel::providers::ffmpeg::{build_ffmpeg_args, drawtext_filters, format_time};
use textreel::providers::EncodeSettings;
use textreel::timeline::{
    AudioSegment, CaptionCue, CaptionOverlay, CaptionRegion, SegmentKind, Timeline, TimelineSegment, VisualSource,
};

use crate::common::HD;

fn caption(cues: Vec<CaptionCue>) -> CaptionOverlay {
    CaptionOverlay {
        cues,
        frame_size: HD,
        region: CaptionRegion::Bottom,
        font_size: 36,
        opacity: 0.85,
        font_color: "white".to_string(),
        box_color: "black".to_string(),
        font_file: None,
    }
}

fn narration(index: usize, start_time: f64, duration: f64, loop_count: u32) -> TimelineSegment {
    TimelineSegment {
        index,
        kind: SegmentKind::Narration,
        start_time,
        duration,
        visual: VisualSource::Footage(FootageWindow {
            source: PathBuf::from("clips/beach.mp4"),
            source_duration: 2.0,
            start: 0.0,
            duration,
            loop_count,
            frame_size: HD,
        }),
        audio: Some(AudioSegment {
            chunk_index: index,
            path: PathBuf::from(format!("/tmp/ws/audio_{:04}.wav", index)),
            duration,
        }),
        caption: Some(caption(vec![CaptionCue {
            text: "Hola.".to_string(),
            start: 0.0,
            end: duration,
            asset: Some(PathBuf::from(format!("/tmp/ws/caption_{:04}_00.txt", index))),
        }])),
    }
}

fn promo(index: usize, start_time: f64, image: Option<PathBuf>) -> TimelineSegment {
    TimelineSegment {
        index,
        kind: SegmentKind::Promotional,
        start_time,
        duration: 5.0,
        visual: VisualSource::Still {
            image,
            color: "black".to_string(),
        },
        audio: None,
        caption: None,
    }
}

fn timeline(segments: Vec<TimelineSegment>) -> Timeline {
    let mut timeline = Timeline::new();
    for segment in segments {
        timeline.push(segment);
    }
    timeline
}

fn filter_graph(args: &[String]) -> &str {
    let position = args
        .iter()
        .position(|a| a == "-filter_complex")
        .expect("filter graph present");
    &args[position + 1]
}

#[test]
fn test_build_ffmpeg_args_withLoopedFootageAndPromo_shouldBuildFullCommand() {
    let timeline = timeline(vec![narration(0, 0.0, 5.0, 3), promo(1, 5.0, None)]);
    let output = Path::new("out/video_output.mp4");

    let args = build_ffmpeg_args(&timeline, output, &EncodeSettings::default()).unwrap();

    assert_eq!(&args[..4], &["-hide_banner", "-loglevel", "error", "-y"]);
    assert!(args.windows(2).any(|w| w[0] == "-stream_loop" && w[1] == "2"));
    assert!(args.contains(&"clips/beach.mp4".to_string()));
    assert!(args.contains(&"/tmp/ws/audio_0000.wav".to_string()));
    assert!(args.contains(&"color=c=black:s=1920x1080:r=24".to_string()));
    assert!(args.contains(&"anullsrc=r=44100:cl=stereo".to_string()));
    assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
    assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "24"));
    assert_eq!(args.last().map(String::as_str), Some("out/video_output.mp4"));

    let graph = filter_graph(&args);
    assert!(graph.contains("[0:v]drawtext=textfile="));
    assert!(graph.contains("scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080"));
    assert!(graph.contains("[2:v]scale="));
    assert!(graph.contains("[3:a]aformat="));
    assert!(graph.ends_with("[v0][a0][v1][a1]concat=n=2:v=1:a=1[vout][aout]"));
}

#[test]
fn test_build_ffmpeg_args_withPromoImage_shouldLoopStill() {
    let timeline = timeline(vec![narration(0, 0.0, 1.5, 1), promo(1, 1.5, Some(PathBuf::from("promo.png")))]);

    let args = build_ffmpeg_args(&timeline, Path::new("out.mp4"), &EncodeSettings::default()).unwrap();

    assert!(!args.contains(&"-stream_loop".to_string()));
    assert!(args
        .windows(5)
        .any(|w| w[0] == "-loop" && w[1] == "1" && w[2] == "-t" && w[3] == "5.000000" && w[4] == "-i"));
    assert!(args.contains(&"promo.png".to_string()));
}

#[test]
fn test_build_ffmpeg_args_withEmptyTimeline_shouldRejectIt() {
    let result = build_ffmpeg_args(&Timeline::new(), Path::new("out.mp4"), &EncodeSettings::default());
    assert!(matches!(result, Err(EncodeError::InvalidTimeline(_))));
}

#[test]
fn test_build_ffmpeg_args_withGap_shouldRejectIt() {
    let timeline = timeline(vec![narration(0, 0.0, 2.0, 1), promo(1, 3.0, None)]);
    let result = build_ffmpeg_args(&timeline, Path::new("out.mp4"), &EncodeSettings::default());
    assert!(matches!(result, Err(EncodeError::InvalidTimeline(_))));
}

#[test]
fn test_build_ffmpeg_args_withZeroDuration_shouldRejectIt() {
    let timeline = timeline(vec![narration(0, 0.0, 0.0, 1), promo(1, 0.0, None)]);
    let result = build_ffmpeg_args(&timeline, Path::new("out.mp4"), &EncodeSettings::default());
    assert!(matches!(result, Err(EncodeError::InvalidTimeline(_))));
}

#[test]
fn test_drawtext_filters_withCues_shouldEnableEachOnItsRange() {
    let overlay = caption(vec![
        CaptionCue {
            text: "Hola.".to_string(),
            start: 0.0,
            end: 1.25,
            asset: Some(PathBuf::from("/tmp/ws/c0.txt")),
        },
        CaptionCue {
            text: "Sin asset".to_string(),
            start: 1.25,
            end: 2.0,
            asset: None,
        },
    ]);

    let filters = drawtext_filters(&overlay);

    assert_eq!(filters.len(), 1);
    assert!(filters[0].starts_with("drawtext=textfile='/tmp/ws/c0.txt'"));
    assert!(filters[0].contains("fontcolor=white@0.85"));
    assert!(filters[0].contains("enable='gte(t,0.000000)*lt(t,1.250000)'"));
    assert!(filters[0].contains("y=h-text_h-58"));
}

#[test]
fn test_drawtext_filters_withAdjacentCues_shouldNotShareBoundaryFrame() {
    let cue = |start: f64, end: f64, name: &str| CaptionCue {
        text: name.to_string(),
        start,
        end,
        asset: Some(PathBuf::from(format!("/tmp/ws/{}.txt", name))),
    };
    let overlay = caption(vec![cue(0.0, 1.0, "a"), cue(1.0, 2.0, "b"), cue(2.0, 3.0, "c")]);

    let filters = drawtext_filters(&overlay);

    assert_eq!(filters.len(), 3);
    assert!(filters[0].ends_with("enable='gte(t,0.000000)*lt(t,1.000000)'"));
    assert!(filters[1].ends_with("enable='gte(t,1.000000)*lt(t,2.000000)'"));
    assert!(filters[2].ends_with("enable='between(t,2.000000,3.000000)'"));
}

#[test]
fn test_drawtext_filters_withPercentInText_shouldDisableExpansion() {
    let overlay = caption(vec![
        CaptionCue {
            text: "El 50% de la gente.".to_string(),
            start: 0.0,
            end: 2.0,
            asset: Some(PathBuf::from("/tmp/ws/c0.txt")),
        },
        CaptionCue {
            text: "C:\\ruta".to_string(),
            start: 2.0,
            end: 3.0,
            asset: Some(PathBuf::from("/tmp/ws/c1.txt")),
        },
    ]);

    let filters = drawtext_filters(&overlay);

    assert_eq!(filters.len(), 2);
    for filter in &filters {
        assert!(filter.starts_with("drawtext=textfile='"));
        assert!(filter.contains(":expansion=none"), "{}", filter);
    }
}

#[test]
fn test_build_ffmpeg_args_withCaptionedStill_shouldDrawAfterCrop() {
    let mut bumper = promo(1, 1.5, Some(PathBuf::from("promo.png")));
    bumper.caption = Some(CaptionOverlay {
        frame_size: textreel::timeline::OUTPUT_FRAME_SIZE,
        ..caption(vec![CaptionCue {
            text: "¡Suscríbete!".to_string(),
            start: 0.0,
            end: 5.0,
            asset: Some(PathBuf::from("/tmp/ws/promo.txt")),
        }])
    });
    let timeline = timeline(vec![narration(0, 0.0, 1.5, 1), bumper]);

    let args = build_ffmpeg_args(&timeline, Path::new("out.mp4"), &EncodeSettings::default()).unwrap();
    let graph = filter_graph(&args);

    assert!(graph.contains("[0:v]drawtext=textfile='/tmp/ws/caption_0000_00.txt'"));
    assert!(graph.contains("[2:v]scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080,drawtext=textfile='/tmp/ws/promo.txt'"));
    assert!(graph.contains("y=h-text_h-86"));
}

#[test]
fn test_format_time_shouldUseMicrosecondPrecision() {
    assert_eq!(format_time(2.5), "2.500000");
    assert_eq!(format_time(1.0 / 3.0), "0.333333");
}
