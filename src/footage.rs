/*!
 * Background footage selection.
 *
 * The selector owns the pool of validated clips and the cursor (or RNG) used
 * to pick from it. Every request returns a window whose duration matches the
 * requested narration duration exactly: short clips are looped, long clips
 * are trimmed at a fixed, leading or random offset.
 */

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::FootageError;
use crate::providers::FootageProbe;
use crate::timeline::FrameSize;

/// How the next clip is chosen from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Round-robin through the pool in order
    #[default]
    Cyclic,
    /// Uniformly sample a clip per request
    Random,
}

/// Where a trim window starts inside a clip longer than required
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimMode {
    /// Start at the beginning of the clip
    Start,
    /// Start at a fixed offset in seconds, clamped so the window fits
    Fixed(f64),
    /// Start at a uniformly random offset that keeps the window inside the clip
    Random,
}

/// A validated background clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootageClip {
    pub path: PathBuf,
    /// Total duration in seconds
    pub duration: f64,
    pub frame_size: FrameSize,
}

impl FootageClip {
    pub fn new(path: impl Into<PathBuf>, duration: f64, frame_size: FrameSize) -> Self {
        Self {
            path: path.into(),
            duration,
            frame_size,
        }
    }

    /// Whether the clip can back a timeline segment
    pub fn is_valid(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0 && self.frame_size.is_valid()
    }
}

/// The window of a clip shown under one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootageWindow {
    /// Source clip
    pub source: PathBuf,
    /// Duration of one copy of the source clip
    pub source_duration: f64,
    /// Start offset into the (looped) source, in seconds
    pub start: f64,
    /// Window duration in seconds
    pub duration: f64,
    /// Number of source copies concatenated before trimming
    pub loop_count: u32,
    /// Native frame size of the source
    pub frame_size: FrameSize,
}

impl FootageWindow {
    /// Whether the source had to be repeated to cover the window
    pub fn is_looped(&self) -> bool {
        self.loop_count > 1
    }

    /// End offset into the (looped) source
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// The set of clips available for selection
#[derive(Debug, Clone)]
pub struct FootagePool {
    clips: Vec<FootageClip>,
}

impl FootagePool {
    /// Build a pool from already-probed clips, dropping invalid ones
    pub fn new(clips: Vec<FootageClip>) -> Result<Self, FootageError> {
        if clips.is_empty() {
            return Err(FootageError::NoValidFootage("footage pool is empty".to_string()));
        }

        let total = clips.len();
        let valid: Vec<FootageClip> = clips
            .into_iter()
            .filter(|clip| {
                let ok = clip.is_valid();
                if !ok {
                    warn!(
                        "Skipping footage {:?}: duration {:.3}s, frame {}",
                        clip.path, clip.duration, clip.frame_size
                    );
                }
                ok
            })
            .collect();

        if valid.is_empty() {
            return Err(FootageError::NoValidFootage(format!(
                "all {} clips failed validation",
                total
            )));
        }

        Ok(Self { clips: valid })
    }

    /// Probe every path and build a pool from the clips that pass
    pub fn probe<P: AsRef<Path>>(paths: &[P], probe: &dyn FootageProbe) -> Result<Self, FootageError> {
        if paths.is_empty() {
            return Err(FootageError::NoValidFootage("no footage supplied".to_string()));
        }

        let mut clips = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            match probe.probe(path) {
                Ok(info) if info.first_frame_readable => {
                    clips.push(FootageClip::new(path, info.duration, info.frame_size));
                }
                Ok(_) => warn!("Skipping footage {:?}: first frame is unreadable", path),
                Err(e) => warn!("Skipping footage {:?}: {}", path, e),
            }
        }

        if clips.is_empty() {
            return Err(FootageError::NoValidFootage(format!(
                "none of the {} clips passed the validity probe",
                paths.len()
            )));
        }

        Self::new(clips)
    }

    pub fn clips(&self) -> &[FootageClip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Chooses, loops and trims clips to match required durations
#[derive(Debug)]
pub struct FootageSelector {
    pool: FootagePool,
    policy: SelectionPolicy,
    trim: TrimMode,
    cursor: usize,
    rng: StdRng,
}

impl FootageSelector {
    /// Create a selector with an OS-seeded RNG
    pub fn new(pool: FootagePool, policy: SelectionPolicy, trim: TrimMode) -> Self {
        Self {
            pool,
            policy,
            trim,
            cursor: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a selector whose random choices are reproducible
    pub fn with_seed(pool: FootagePool, policy: SelectionPolicy, trim: TrimMode, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(pool, policy, trim)
        }
    }

    pub fn pool(&self) -> &FootagePool {
        &self.pool
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Return a window of exactly `required` seconds
    pub fn select(&mut self, required: f64) -> Result<FootageWindow, FootageError> {
        if !required.is_finite() || required <= 0.0 {
            return Err(FootageError::InvalidDuration(required));
        }

        let clip = self.next_clip().clone();

        let (start, loop_count) = if clip.duration < required {
            let copies = (required / clip.duration).ceil().max(1.0) as u32;
            (0.0, copies)
        } else {
            let slack = clip.duration - required;
            let start = match self.trim {
                TrimMode::Start => 0.0,
                TrimMode::Fixed(offset) if offset.is_finite() => offset.clamp(0.0, slack),
                TrimMode::Fixed(_) => 0.0,
                TrimMode::Random if slack > 0.0 => self.rng.random_range(0.0..=slack),
                TrimMode::Random => 0.0,
            };
            (start, 1)
        };

        let window = FootageWindow {
            source: clip.path,
            source_duration: clip.duration,
            start,
            duration: required,
            loop_count,
            frame_size: clip.frame_size,
        };

        debug!(
            "Footage {:?}: {:.3}s..{:.3}s ({} cop{})",
            window.source,
            window.start,
            window.end(),
            loop_count,
            if window.is_looped() { "ies" } else { "y" }
        );

        Ok(window)
    }

    fn next_clip(&mut self) -> &FootageClip {
        let len = self.pool.len();
        let index = match self.policy {
            SelectionPolicy::Cyclic => {
                let index = self.cursor % len;
                self.cursor = (self.cursor + 1) % len;
                index
            }
            SelectionPolicy::Random => self.rng.random_range(0..len),
        };
        &self.pool.clips[index]
    }
}
