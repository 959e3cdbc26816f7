/*!
 * Interfaces to the external collaborators of the assembly engine.
 *
 * The engine never synthesizes speech, decodes video or draws text itself.
 * It talks to these traits instead:
 * - `SpeechSynthesizer`: text + voice to audio bytes and duration
 * - `FootageProbe`: validity probe for background clips
 * - `CaptionRenderer`: caption overlay assets for a segment
 * - `Encoder`: timeline to output file
 *
 * Implementations:
 * - `google_tts`: Google Cloud Text-to-Speech REST client
 * - `ffmpeg`: ffprobe/ffmpeg subprocess probe and encoder
 * - `drawtext`: ffmpeg drawtext caption assets
 * - `mock`: in-memory synthesizer for tests
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::{EncodeError, FootageError, ProviderError, RenderError};
use crate::timeline::{CaptionCue, CaptionOverlay, FrameSize, Timeline};

pub mod drawtext;
pub mod ffmpeg;
pub mod google_tts;
pub mod mock;

/// Audio produced for one chunk of text
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    /// Encoded audio (WAV for the shipped providers)
    pub audio: Bytes,
    /// Duration in seconds as reported by the provider
    pub duration: f64,
}

/// Text-to-speech collaborator
///
/// Implementations must report rate limiting as
/// [`ProviderError::RateLimitExceeded`]; every other error is treated as fatal.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    /// Synthesize `text` with the voice identified by `voice`
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedSpeech, ProviderError>;
}

/// What a probe learned about a background clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    /// Total duration in seconds
    pub duration: f64,
    /// Native frame size
    pub frame_size: FrameSize,
    /// Whether the first video frame could be decoded
    pub first_frame_readable: bool,
}

/// Validity probe for background footage
pub trait FootageProbe: Send + Sync + Debug {
    /// Inspect the clip at `path`
    fn probe(&self, path: &Path) -> Result<ClipInfo, FootageError>;
}

/// Everything a renderer needs to produce the caption for one segment
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    /// Index of the segment on the timeline
    pub segment_index: usize,
    /// Timed caption cues, relative to the segment start
    pub cues: Vec<CaptionCue>,
    /// Frame size of the footage the caption is drawn on
    pub frame_size: FrameSize,
    /// Segment duration in seconds
    pub duration: f64,
    /// Directory where assets may be written; removed when the attempt ends
    pub workspace: PathBuf,
}

/// Caption rasterization collaborator
pub trait CaptionRenderer: Send + Sync + Debug {
    /// Produce the caption overlay for one segment
    fn render(&self, request: &CaptionRequest) -> Result<CaptionOverlay, RenderError>;
}

/// Fixed encoding parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    /// Output frame rate
    pub fps: u32,
    /// Output frame size
    pub frame_size: FrameSize,
    /// Video codec passed to the encoder
    pub video_codec: String,
    /// Audio codec passed to the encoder
    pub audio_codec: String,
    /// Audio sample rate of the output track
    pub audio_sample_rate: u32,
    /// Encoder speed/quality preset
    pub preset: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            fps: crate::timeline::OUTPUT_FPS,
            frame_size: crate::timeline::OUTPUT_FRAME_SIZE,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_sample_rate: 44_100,
            preset: "medium".to_string(),
        }
    }
}

/// Video encoding collaborator
#[async_trait]
pub trait Encoder: Send + Sync + Debug {
    /// Encode the sorted `timeline` into `output`
    async fn encode(
        &self,
        timeline: &Timeline,
        output: &Path,
        settings: &EncodeSettings,
    ) -> Result<(), EncodeError>;
}
