/*!
 * Timeline assembly.
 *
 * For every chunk, in order: synthesize the narration, select footage of the
 * same duration, render the caption for that footage, and place the result at
 * the running cursor. After the last chunk the fixed promotional bumper is
 * appended. A failure at any chunk aborts the whole assembly.
 */

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::{AssemblyError, RenderError, SegmentationError};
use crate::footage::FootageSelector;
use crate::ledger::ResourceLedger;
use crate::providers::{CaptionRenderer, CaptionRequest, SpeechSynthesizer};
use crate::segmenter::TextChunk;
use crate::synthesis::{synthesize_chunk, RetryPolicy, Sleeper, TokioSleeper};
use crate::timeline::{
    CaptionCue, CaptionOverlay, FrameSize, SegmentKind, Timeline, TimelineSegment, VisualSource,
    OUTPUT_FRAME_SIZE, PROMO_DURATION_SECS,
};

/// Highest opacity a caption may be blended with
pub const MAX_CAPTION_OPACITY: f64 = 0.95;

/// Promotional bumper settings
#[derive(Debug, Clone, PartialEq)]
pub struct PromoOptions {
    /// Caption drawn on the bumper; empty for none
    pub text: String,
    /// Still image shown; a solid colour card when `None`
    pub image: Option<PathBuf>,
    /// Background colour of the colour card
    pub background_color: String,
}

impl Default for PromoOptions {
    fn default() -> Self {
        Self {
            text: "¡Suscríbete!".to_string(),
            image: None,
            background_color: "black".to_string(),
        }
    }
}

/// Assembly behaviour switches
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOptions {
    /// Burn captions onto narration segments
    pub captions: bool,
    pub promo: PromoOptions,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            captions: true,
            promo: PromoOptions::default(),
        }
    }
}

/// Progress after a chunk has been placed on the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyProgress {
    /// Chunks finished so far
    pub completed: usize,
    /// Chunks in the narration
    pub total: usize,
    /// Percentage complete, 0-100
    pub percent: f64,
}

/// Builds a [`Timeline`] from narration chunks
pub struct TimelineAssembler<'a> {
    synthesizer: &'a dyn SpeechSynthesizer,
    renderer: &'a dyn CaptionRenderer,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    options: AssemblyOptions,
}

impl<'a> TimelineAssembler<'a> {
    pub fn new(
        synthesizer: &'a dyn SpeechSynthesizer,
        renderer: &'a dyn CaptionRenderer,
        options: AssemblyOptions,
    ) -> Self {
        Self {
            synthesizer,
            renderer,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            options,
        }
    }

    /// Use a custom retry policy for synthesis
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use a custom sleeper for retry backoff
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Assemble the full timeline for `chunks`.
    ///
    /// Every temporary artifact is registered with `ledger`; releasing it is
    /// the caller's job, on success and on failure.
    pub async fn assemble(
        &self,
        chunks: &[TextChunk],
        voice: &str,
        selector: &mut FootageSelector,
        ledger: &mut ResourceLedger,
        mut progress: impl FnMut(AssemblyProgress),
    ) -> Result<Timeline, AssemblyError> {
        if chunks.is_empty() {
            return Err(SegmentationError::EmptyInput.into());
        }

        let total = chunks.len();
        let mut timeline = Timeline::new();
        let mut cursor = 0.0_f64;

        for (position, chunk) in chunks.iter().enumerate() {
            let audio = synthesize_chunk(
                self.synthesizer,
                &self.retry,
                self.sleeper.as_ref(),
                ledger,
                chunk.index,
                &chunk.text,
                voice,
            )
            .await?;
            let duration = audio.duration;

            let window = selector
                .select(duration)
                .map_err(|source| AssemblyError::Footage {
                    chunk_index: chunk.index,
                    source,
                })?;

            let caption = if self.options.captions {
                let cues = caption_cues(chunk, duration);
                let overlay = self
                    .render_caption(position, cues, window.frame_size, duration, ledger)
                    .map_err(|source| AssemblyError::Render {
                        chunk_index: chunk.index,
                        source,
                    })?;
                Some(overlay)
            } else {
                None
            };

            debug!(
                "Chunk {}: start {:.3}s, duration {:.3}s, footage {:?}",
                chunk.index, cursor, duration, window.source
            );

            timeline.push(TimelineSegment {
                index: position,
                kind: SegmentKind::Narration,
                start_time: cursor,
                duration,
                visual: VisualSource::Footage(window),
                audio: Some(audio),
                caption,
            });
            cursor += duration;

            let completed = position + 1;
            progress(AssemblyProgress {
                completed,
                total,
                percent: completed as f64 * 100.0 / total as f64,
            });
        }

        let promo = self.promo_segment(total, cursor, ledger)?;
        timeline.push(promo);
        timeline.sort_by_start();
        if let Err(gap) = timeline.check_contiguous() {
            warn!("Timeline is not contiguous: {}", gap);
        }

        info!(
            "Assembled {} narration segments ({:.2}s) plus {:.0}s bumper",
            total,
            timeline.narration_duration(),
            PROMO_DURATION_SECS
        );

        Ok(timeline)
    }

    fn promo_segment(
        &self,
        index: usize,
        start_time: f64,
        ledger: &mut ResourceLedger,
    ) -> Result<TimelineSegment, AssemblyError> {
        let promo = &self.options.promo;
        let caption = if promo.text.trim().is_empty() {
            None
        } else {
            let cues = vec![CaptionCue {
                text: promo.text.clone(),
                start: 0.0,
                end: PROMO_DURATION_SECS,
                asset: None,
            }];
            let overlay = self
                .render_caption(index, cues, OUTPUT_FRAME_SIZE, PROMO_DURATION_SECS, ledger)
                .map_err(AssemblyError::PromoRender)?;
            Some(overlay)
        };

        Ok(TimelineSegment {
            index,
            kind: SegmentKind::Promotional,
            start_time,
            duration: PROMO_DURATION_SECS,
            visual: VisualSource::Still {
                image: promo.image.clone(),
                color: promo.background_color.clone(),
            },
            audio: None,
            caption,
        })
    }

    fn render_caption(
        &self,
        segment_index: usize,
        cues: Vec<CaptionCue>,
        frame_size: FrameSize,
        duration: f64,
        ledger: &mut ResourceLedger,
    ) -> Result<CaptionOverlay, RenderError> {
        let request = CaptionRequest {
            segment_index,
            cues,
            frame_size,
            duration,
            workspace: ledger.workspace().to_path_buf(),
        };

        let mut overlay = self.renderer.render(&request)?;

        for asset in overlay.cues.iter().filter_map(|cue| cue.asset.clone()) {
            ledger.track(asset);
        }
        overlay.opacity = overlay.opacity.clamp(0.0, MAX_CAPTION_OPACITY);

        Ok(overlay)
    }
}

/// Time each caption unit of `chunk` across `duration`, in proportion to its length
pub fn caption_cues(chunk: &TextChunk, duration: f64) -> Vec<CaptionCue> {
    let total_chars: usize = chunk.captions.iter().map(|c| c.char_len).sum();
    if chunk.captions.is_empty() || total_chars == 0 {
        return vec![CaptionCue {
            text: chunk.text.clone(),
            start: 0.0,
            end: duration,
            asset: None,
        }];
    }

    let last = chunk.captions.len() - 1;
    let mut start = 0.0;
    chunk
        .captions
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let end = if i == last {
                duration
            } else {
                start + duration * unit.char_len as f64 / total_chars as f64
            };
            let cue = CaptionCue {
                text: unit.text.clone(),
                start,
                end,
                asset: None,
            };
            start = end;
            cue
        })
        .collect()
}
