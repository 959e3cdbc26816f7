/*!
 * Fake collaborators for testing
 *
 * These stand in for ffprobe, ffmpeg and the tokio timer so tests never
 * spawn processes or wait on real backoff delays.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use textreel::errors::{EncodeError, FootageError};
use textreel::providers::{ClipInfo, EncodeSettings, Encoder, FootageProbe};
use textreel::synthesis::Sleeper;
use textreel::timeline::{FrameSize, Timeline};

/// Probe answering from a fixed table; unknown paths fail
#[derive(Debug, Clone, Default)]
pub struct FakeProbe {
    known: HashMap<PathBuf, ClipInfo>,
}

impl FakeProbe {
    pub fn new(known: HashMap<PathBuf, ClipInfo>) -> Self {
        Self { known }
    }

    pub fn readable(duration: f64, frame_size: FrameSize) -> ClipInfo {
        ClipInfo {
            duration,
            frame_size,
            first_frame_readable: true,
        }
    }

    pub fn with(mut self, path: impl Into<PathBuf>, info: ClipInfo) -> Self {
        self.known.insert(path.into(), info);
        self
    }
}

impl FootageProbe for FakeProbe {
    fn probe(&self, path: &Path) -> Result<ClipInfo, FootageError> {
        self.known.get(path).cloned().ok_or_else(|| FootageError::Probe {
            path: path.to_path_buf(),
            message: "not a video".to_string(),
        })
    }
}

/// Sleeper that records requested delays and returns at once
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}

/// What the fake encoder saw on one call
#[derive(Debug, Clone)]
pub struct EncodeCall {
    pub output: PathBuf,
    pub timeline: Timeline,
    /// Whether every narration audio file existed when encoding started
    pub audio_present: bool,
}

/// Encoder that writes a marker file, or a partial file and then fails
#[derive(Debug, Clone, Default)]
pub struct FakeEncoder {
    fail: bool,
    calls: Arc<Mutex<Vec<EncodeCall>>>,
}

impl FakeEncoder {
    pub fn working() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(
        &self,
        timeline: &Timeline,
        output: &Path,
        _settings: &EncodeSettings,
    ) -> Result<(), EncodeError> {
        let audio_present = timeline.audio_track().iter().all(|audio| audio.path.is_file());
        self.calls.lock().push(EncodeCall {
            output: output.to_path_buf(),
            timeline: timeline.clone(),
            audio_present,
        });

        if self.fail {
            let _ = std::fs::write(output, b"partial");
            return Err(EncodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "Conversion failed!".to_string(),
            });
        }

        std::fs::write(output, b"video").map_err(|source| EncodeError::Spawn {
            program: "fake".to_string(),
            source,
        })
    }
}
