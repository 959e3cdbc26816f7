/*!
 * Timeline data model.
 *
 * A timeline is the full, time-addressed description of the output video
 * before encoding: narration segments laid end to end, followed by the
 * promotional bumper.
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::footage::FootageWindow;

/// Output frame rate
pub const OUTPUT_FPS: u32 = 24;

/// Output frame size
pub const OUTPUT_FRAME_SIZE: FrameSize = FrameSize {
    width: 1920,
    height: 1080,
};

/// Duration of the trailing promotional segment in seconds
pub const PROMO_DURATION_SECS: f64 = 5.0;

/// Length of one frame at the output frame rate
pub fn frame_interval() -> f64 {
    1.0 / f64::from(OUTPUT_FPS)
}

/// Width and height of a video frame in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Whether both dimensions are non-zero
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Vertical placement of captions on the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptionRegion {
    Top,
    Center,
    #[default]
    Bottom,
}

/// One caption shown for part of a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    /// Text shown
    pub text: String,
    /// Start offset from the segment start, in seconds
    pub start: f64,
    /// End offset from the segment start, in seconds
    pub end: f64,
    /// Rendered asset for this cue, if the renderer produced one
    #[serde(default)]
    pub asset: Option<PathBuf>,
}

/// Caption overlay blended onto a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionOverlay {
    /// Timed cues
    pub cues: Vec<CaptionCue>,
    /// Frame size the overlay was laid out for
    pub frame_size: FrameSize,
    /// Placement on the frame
    pub region: CaptionRegion,
    /// Font size in pixels
    pub font_size: u32,
    /// Blend opacity, always below 1.0
    pub opacity: f64,
    /// Text colour
    pub font_color: String,
    /// Colour of the box behind the text
    pub box_color: String,
    /// Font used to draw the text
    #[serde(default)]
    pub font_file: Option<PathBuf>,
}

/// Synthesized narration for one chunk, stored in a temporary file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    /// Chunk the audio belongs to
    pub chunk_index: usize,
    /// Temporary file holding the audio
    pub path: PathBuf,
    /// Duration in seconds
    pub duration: f64,
}

/// What is shown on screen for a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisualSource {
    /// A trimmed (and possibly looped) window of a background clip
    Footage(FootageWindow),
    /// A static image, or a solid colour card when no image is set
    Still {
        image: Option<PathBuf>,
        color: String,
    },
}

/// Role of a segment on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Narration,
    Promotional,
}

/// The atomic composable unit of a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSegment {
    /// Insertion index
    pub index: usize,
    pub kind: SegmentKind,
    /// Start time in seconds
    pub start_time: f64,
    /// Duration in seconds
    pub duration: f64,
    pub visual: VisualSource,
    pub audio: Option<AudioSegment>,
    pub caption: Option<CaptionOverlay>,
}

impl TimelineSegment {
    /// End time in seconds
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Ordered description of the output video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub segments: Vec<TimelineSegment>,
    pub fps: u32,
    pub frame_size: FrameSize,
}

impl Timeline {
    /// Create an empty timeline at the fixed output format
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            fps: OUTPUT_FPS,
            frame_size: OUTPUT_FRAME_SIZE,
        }
    }

    /// Append a segment; ordering is restored by [`Timeline::sort_by_start`]
    pub fn push(&mut self, segment: TimelineSegment) {
        self.segments.push(segment);
    }

    /// Sort segments by start time.
    ///
    /// The sort is stable, so segments sharing a start time keep their
    /// insertion order.
    pub fn sort_by_start(&mut self) {
        self.segments
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    }

    /// Iterate over narration segments
    pub fn narration(&self) -> impl Iterator<Item = &TimelineSegment> {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Narration)
    }

    /// The trailing promotional segment, if present
    pub fn promotional(&self) -> Option<&TimelineSegment> {
        self.segments
            .iter()
            .find(|s| s.kind == SegmentKind::Promotional)
    }

    /// Sum of narration durations
    pub fn narration_duration(&self) -> f64 {
        self.narration().map(|s| s.duration).sum()
    }

    /// End time of the last segment
    pub fn total_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(TimelineSegment::end_time)
            .fold(0.0, f64::max)
    }

    /// Start times in timeline order
    pub fn start_times(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.start_time).collect()
    }

    /// The concatenated narration audio track, in timeline order
    pub fn audio_track(&self) -> Vec<&AudioSegment> {
        self.segments
            .iter()
            .filter_map(|s| s.audio.as_ref())
            .collect()
    }

    /// Check that segments are gapless and non-overlapping.
    ///
    /// Returns a description of the first discontinuity found.
    pub fn check_contiguous(&self) -> Result<(), String> {
        let tolerance = 1e-9;
        let mut cursor = 0.0;
        for segment in &self.segments {
            if (segment.start_time - cursor).abs() > tolerance {
                return Err(format!(
                    "segment {} starts at {:.3}s, expected {:.3}s",
                    segment.index, segment.start_time, cursor
                ));
            }
            cursor = segment.end_time();
        }
        Ok(())
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}
