/*!
 * One generation attempt, end to end.
 *
 * The pipeline opens a ledger scope, segments the text, assembles the
 * timeline, encodes it and then releases every temporary artifact exactly
 * once, whatever the outcome. A failed encode never leaves a partial output
 * file behind.
 */

use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assembler::{AssemblyOptions, AssemblyProgress, TimelineAssembler};
use crate::errors::AssemblyError;
use crate::footage::{FootagePool, FootageSelector, SelectionPolicy, TrimMode};
use crate::ledger::{ReleaseReport, ResourceLedger};
use crate::providers::{CaptionRenderer, EncodeSettings, Encoder, SpeechSynthesizer};
use crate::segmenter::{DEFAULT_MAX_CAPTION_CHARS, TextSegmenter};
use crate::synthesis::{RetryPolicy, Sleeper, TokioSleeper};
use crate::timeline::Timeline;

/// Default synthesis request size in characters
pub const DEFAULT_MAX_CHARS: usize = 4500;

/// Tunables for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Upper bound on characters per synthesis request
    pub max_chars: usize,
    /// Upper bound on characters per on-screen caption
    pub max_caption_chars: usize,
    pub retry: RetryPolicy,
    pub selection: SelectionPolicy,
    pub trim: TrimMode,
    /// Seed for footage choices; OS entropy when `None`
    pub seed: Option<u64>,
    pub assembly: AssemblyOptions,
    pub encode: EncodeSettings,
    /// Where per-attempt workspaces are created
    pub temp_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            max_caption_chars: DEFAULT_MAX_CAPTION_CHARS,
            retry: RetryPolicy::default(),
            selection: SelectionPolicy::Cyclic,
            trim: TrimMode::Start,
            seed: None,
            assembly: AssemblyOptions::default(),
            encode: EncodeSettings::default(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// What to generate
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub text: String,
    pub voice: String,
    pub footage: FootagePool,
    pub output: PathBuf,
}

/// Outcome of a successful attempt
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub output: PathBuf,
    /// The timeline that was encoded; its temporary files are already gone
    pub timeline: Timeline,
    pub chunk_count: usize,
    pub total_duration: f64,
    pub elapsed: Duration,
    pub released: ReleaseReport,
}

/// Text to finished video
pub struct NarrationPipeline {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    renderer: Arc<dyn CaptionRenderer>,
    encoder: Arc<dyn Encoder>,
    sleeper: Arc<dyn Sleeper>,
    settings: PipelineSettings,
}

impl NarrationPipeline {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        renderer: Arc<dyn CaptionRenderer>,
        encoder: Arc<dyn Encoder>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            synthesizer,
            renderer,
            encoder,
            sleeper: Arc::new(TokioSleeper),
            settings,
        }
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one full generation attempt
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        progress: impl FnMut(AssemblyProgress),
    ) -> Result<GenerationReport, AssemblyError> {
        let started = Instant::now();

        let chunks = TextSegmenter::new(self.settings.max_chars)
            .with_caption_limit(self.settings.max_caption_chars)
            .segment(&request.text)?;
        info!("Narration split into {} chunks", chunks.len());

        let mut selector = match self.settings.seed {
            Some(seed) => FootageSelector::with_seed(
                request.footage.clone(),
                self.settings.selection,
                self.settings.trim,
                seed,
            ),
            None => FootageSelector::new(request.footage.clone(), self.settings.selection, self.settings.trim),
        };

        let mut ledger = ResourceLedger::new(&self.settings.temp_dir)?;
        let outcome = self
            .assemble_and_encode(&chunks, request, &mut selector, &mut ledger, progress)
            .await;
        let released = ledger.release_all();
        if released.failed > 0 {
            warn!("{} temporary resources could not be removed", released.failed);
        }

        match outcome {
            Ok(timeline) => {
                let total_duration = timeline.total_duration();
                info!(
                    "Generated {:?} ({:.2}s) in {:.1}s",
                    request.output,
                    total_duration,
                    started.elapsed().as_secs_f64()
                );
                Ok(GenerationReport {
                    output: request.output.clone(),
                    chunk_count: chunks.len(),
                    total_duration,
                    timeline,
                    elapsed: started.elapsed(),
                    released,
                })
            }
            Err(e) => {
                error!("Generation aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn assemble_and_encode(
        &self,
        chunks: &[crate::segmenter::TextChunk],
        request: &GenerationRequest,
        selector: &mut FootageSelector,
        ledger: &mut ResourceLedger,
        progress: impl FnMut(AssemblyProgress),
    ) -> Result<Timeline, AssemblyError> {
        let assembler = TimelineAssembler::new(
            self.synthesizer.as_ref(),
            self.renderer.as_ref(),
            self.settings.assembly.clone(),
        )
        .with_retry_policy(self.settings.retry.clone())
        .with_sleeper(Arc::clone(&self.sleeper));

        let timeline = assembler
            .assemble(chunks, &request.voice, selector, ledger, progress)
            .await?;
        debug!(
            "Encoding {} segments with {} audio tracks, starts {:?}",
            timeline.segments.len(),
            timeline.audio_track().len(),
            timeline.start_times()
        );

        if let Err(e) = self
            .encoder
            .encode(&timeline, &request.output, &self.settings.encode)
            .await
        {
            remove_partial_output(&request.output);
            return Err(e.into());
        }

        Ok(timeline)
    }
}

fn remove_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => warn!("Removed partial output {:?}", output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {:?}: {}", output, e),
    }
}
