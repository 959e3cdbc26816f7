use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::{Config, SynthesisProvider};
use crate::assembler::AssemblyProgress;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::footage::FootagePool;
use crate::pipeline::{GenerationReport, GenerationRequest, NarrationPipeline};
use crate::providers::drawtext::DrawTextRenderer;
use crate::providers::ffmpeg::{FfmpegEncoder, FfprobeProbe};
use crate::providers::google_tts::GoogleTts;
use crate::providers::mock::MockSynthesizer;
use crate::providers::{CaptionRenderer, Encoder, FootageProbe, SpeechSynthesizer};
use crate::segmenter::normalize_whitespace;
use crate::synthesis::{Sleeper, TokioSleeper};

// @module: Application controller for narrated video generation

/// What the user asked to generate
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Narration text
    pub text: String,
    /// Output title; the configured default file name when unset
    pub title: Option<String>,
    /// Explicit clip selection; relative paths resolve against `footage_dir`
    pub clips: Vec<PathBuf>,
    /// Folder whose clips are used when no explicit selection is given
    pub footage_dir: Option<PathBuf>,
    /// Folder receiving the video
    pub output_dir: Option<PathBuf>,
    /// Replace an existing output file
    pub force_overwrite: bool,
}

/// Result of a controller run
#[derive(Debug)]
pub enum RunOutcome {
    /// A video was written
    Generated(GenerationReport),
    /// The output already existed and overwriting was not requested
    Skipped(PathBuf),
}

/// Main application controller for narrated video generation
pub struct Controller {
    // @field: App configuration
    config: Config,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    probe: Arc<dyn FootageProbe>,
    renderer: Arc<dyn CaptionRenderer>,
    encoder: Arc<dyn Encoder>,
    sleeper: Arc<dyn Sleeper>,
}

impl Controller {
    // @method: Create a new controller with the providers named by the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let synthesizer: Arc<dyn SpeechSynthesizer> = match config.synthesis.provider {
            SynthesisProvider::Google => Arc::new(
                GoogleTts::new(
                    config.synthesis.get_api_key(),
                    config.synthesis.endpoint.clone(),
                    config.synthesis.language_code.clone(),
                    config.synthesis.timeout(),
                )
                .sample_rate(config.synthesis.sample_rate_hertz)
                .speaking_rate(config.synthesis.speaking_rate),
            ),
            SynthesisProvider::Mock => Arc::new(MockSynthesizer::working(Vec::new())),
        };

        info!("Narration provider: {}", config.synthesis.provider.display_name());

        let probe = Arc::new(FfprobeProbe::new(&config.output.ffprobe_path));
        let renderer = Arc::new(DrawTextRenderer::new(config.captions.style()));
        let encoder = Arc::new(FfmpegEncoder::new(&config.output.ffmpeg_path));

        Ok(Self::with_components(config, synthesizer, probe, renderer, encoder))
    }

    /// Create a controller around explicit collaborators
    pub fn with_components(
        config: Config,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        probe: Arc<dyn FootageProbe>,
        renderer: Arc<dyn CaptionRenderer>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        Self {
            config,
            synthesizer,
            probe,
            renderer,
            encoder,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check the request before any work starts
    pub fn validate_options(&self, options: &GenerateOptions) -> Result<(), AppError> {
        if options.text.trim().is_empty() {
            return Err(AppError::Input("narration text is empty".to_string()));
        }
        if options.footage_dir.is_none() && options.clips.is_empty() {
            return Err(AppError::Input(
                "no footage given: pass a footage folder or at least one clip".to_string(),
            ));
        }
        if options.output_dir.is_none() {
            return Err(AppError::Input("no output folder given".to_string()));
        }
        Ok(())
    }

    /// Resolve the clips to use, in order
    pub fn discover_footage(&self, options: &GenerateOptions) -> Result<Vec<PathBuf>, AppError> {
        let clips = if options.clips.is_empty() {
            let dir = options
                .footage_dir
                .as_ref()
                .ok_or_else(|| AppError::Input("no footage folder given".to_string()))?;
            if !FileManager::dir_exists(dir) {
                return Err(AppError::File(format!("Footage folder does not exist: {:?}", dir)));
            }
            FileManager::find_files_with_extensions(dir, &self.config.footage.extensions)?
        } else {
            options
                .clips
                .iter()
                .map(|clip| match &options.footage_dir {
                    Some(dir) if clip.is_relative() => dir.join(clip),
                    _ => clip.clone(),
                })
                .collect()
        };

        if clips.is_empty() {
            return Err(AppError::Input("select at least one clip".to_string()));
        }
        if let Some(missing) = clips.iter().find(|clip| !FileManager::file_exists(clip)) {
            return Err(AppError::File(format!("Clip does not exist: {:?}", missing)));
        }

        debug!("Using {} clips: {:?}", clips.len(), clips);
        Ok(clips)
    }

    /// Where the video for `options` is written
    pub fn output_path(&self, options: &GenerateOptions) -> PathBuf {
        let dir = options.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        FileManager::generate_output_path(dir, options.title.as_deref(), &self.config.output.default_filename)
    }

    /// Run the main workflow
    pub async fn run(&self, options: GenerateOptions) -> Result<RunOutcome> {
        self.validate_options(&options)?;

        let output_path = self.output_path(&options);
        if output_path.exists() && !options.force_overwrite {
            warn!("Skipping, output already exists (use -f to force overwrite): {:?}", output_path);
            return Ok(RunOutcome::Skipped(output_path));
        }
        if let Some(parent) = output_path.parent() {
            FileManager::ensure_dir(parent)?;
        }

        let clips = self.discover_footage(&options)?;
        let probe = Arc::clone(&self.probe);
        let probe_paths = clips.clone();
        let footage = tokio::task::spawn_blocking(move || FootagePool::probe(&probe_paths, probe.as_ref()))
            .await
            .context("Footage probe task failed")?
            .map_err(AppError::from)?;
        info!("{} of {} clips usable as background footage", footage.len(), clips.len());

        let voice = self.config.voice_id();
        let request = GenerationRequest {
            text: normalize_whitespace(&options.text),
            voice,
            footage,
            output: output_path.clone(),
        };

        let pipeline = NarrationPipeline::new(
            Arc::clone(&self.synthesizer),
            Arc::clone(&self.renderer),
            Arc::clone(&self.encoder),
            self.config.pipeline_settings(),
        )
        .with_sleeper(Arc::clone(&self.sleeper));

        let progress_bar = Self::create_progress_bar();
        let result = pipeline
            .generate(&request, |update| Self::report_progress(&progress_bar, update))
            .await;

        match result {
            Ok(report) => {
                progress_bar.finish_with_message("done");
                info!(
                    "Video written to {:?}: {} chunks, {:.1}s of video in {}",
                    report.output,
                    report.chunk_count,
                    report.total_duration,
                    Self::format_duration(report.elapsed)
                );
                Ok(RunOutcome::Generated(report))
            }
            Err(e) => {
                progress_bar.abandon_with_message("failed");
                Err(AppError::from(e).into())
            }
        }
    }

    fn create_progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("narrating");
        progress_bar
    }

    fn report_progress(progress_bar: &ProgressBar, update: AssemblyProgress) {
        progress_bar.set_length(update.total as u64);
        progress_bar.set_position(update.completed as u64);
        info!("Progress: {:.0}%", update.percent);
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Read narration text from an argument or a file
pub fn load_narration(text: Option<String>, text_file: Option<&Path>) -> Result<String, AppError> {
    match (text, text_file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => FileManager::read_to_string(path).map_err(AppError::from),
        (None, None) => Err(AppError::Input("no narration text given".to_string())),
    }
}
