use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assembler::{AssemblyOptions, PromoOptions};
use crate::footage::{SelectionPolicy, TrimMode};
use crate::pipeline::PipelineSettings;
use crate::providers::drawtext::CaptionStyle;
use crate::providers::EncodeSettings;
use crate::synthesis::RetryPolicy;
use crate::timeline::CaptionRegion;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "GOOGLE_TTS_API_KEY";

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Narration voice id (or its display form)
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Parent directory for per-run workspaces; system temp dir when unset
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Speech synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Background footage settings
    #[serde(default)]
    pub footage: FootageConfig,

    /// Caption settings
    #[serde(default)]
    pub captions: CaptionConfig,

    /// Closing bumper settings
    #[serde(default)]
    pub promo: PromoConfig,

    /// Encoder and output file settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Speech synthesis provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisProvider {
    // @provider: Google Cloud Text-to-Speech
    #[default]
    Google,
    // @provider: Offline silent audio, for dry runs
    Mock,
}

impl SynthesisProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Google => "Google Cloud Text-to-Speech",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Google => "google".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

impl std::fmt::Display for SynthesisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for SynthesisProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid synthesis provider: {}", s)),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub provider: SynthesisProvider,

    /// API key; falls back to the `GOOGLE_TTS_API_KEY` environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Language code sent with every request
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Sample rate of the synthesized audio
    #[serde(default = "default_sample_rate_hertz")]
    pub sample_rate_hertz: u32,

    /// Speaking rate, 1.0 is normal speed
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f64,

    /// Maximum characters sent in one synthesis request
    #[serde(default = "default_max_chars_per_request")]
    pub max_chars_per_request: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a rate-limited request
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: SynthesisProvider::default(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            language_code: default_language_code(),
            sample_rate_hertz: default_sample_rate_hertz(),
            speaking_rate: default_speaking_rate(),
            max_chars_per_request: default_max_chars_per_request(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl SynthesisConfig {
    /// Configured API key, or the one from the environment
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(API_KEY_ENV).unwrap_or_default()
    }

    /// Retry policy for rate-limited requests
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_count,
            Duration::from_millis(self.retry_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where trimming starts inside a long clip
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrimStart {
    #[default]
    Start,
    Fixed,
    Random,
}

/// Background footage configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FootageConfig {
    /// How clips are picked from the pool
    #[serde(default)]
    pub policy: SelectionPolicy,

    /// Where the window starts inside a clip longer than needed
    #[serde(default)]
    pub trim: TrimStart,

    /// Offset used with `trim: "fixed"`
    #[serde(default)]
    pub fixed_offset_secs: f64,

    /// File extensions picked up from the footage folder
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Seed for reproducible random choices
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FootageConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            trim: TrimStart::default(),
            fixed_offset_secs: 0.0,
            extensions: default_extensions(),
            seed: None,
        }
    }
}

impl FootageConfig {
    pub fn trim_mode(&self) -> TrimMode {
        match self.trim {
            TrimStart::Start => TrimMode::Start,
            TrimStart::Fixed => TrimMode::Fixed(self.fixed_offset_secs),
            TrimStart::Random => TrimMode::Random,
        }
    }
}

/// Caption configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptionConfig {
    /// Whether captions are burned in
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Blend opacity, strictly between 0 and 1
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Font size as a fraction of the frame height
    #[serde(default = "default_font_size_ratio")]
    pub font_size_ratio: f64,

    #[serde(default)]
    pub region: CaptionRegion,

    /// Maximum characters of one on-screen caption
    #[serde(default = "default_max_caption_chars")]
    pub max_caption_chars: usize,

    /// Characters per line before wrapping
    #[serde(default = "default_max_line_chars")]
    pub max_line_chars: usize,

    #[serde(default = "default_font_color")]
    pub font_color: String,

    #[serde(default = "default_box_color")]
    pub box_color: String,

    /// TrueType font used for captions; ffmpeg's default when unset
    #[serde(default)]
    pub font_file: Option<PathBuf>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: default_opacity(),
            font_size_ratio: default_font_size_ratio(),
            region: CaptionRegion::default(),
            max_caption_chars: default_max_caption_chars(),
            max_line_chars: default_max_line_chars(),
            font_color: default_font_color(),
            box_color: default_box_color(),
            font_file: None,
        }
    }
}

impl CaptionConfig {
    pub fn style(&self) -> CaptionStyle {
        CaptionStyle {
            opacity: self.opacity,
            font_size_ratio: self.font_size_ratio,
            region: self.region,
            max_line_chars: self.max_line_chars,
            font_color: self.font_color.clone(),
            box_color: self.box_color.clone(),
            font_file: self.font_file.clone(),
        }
    }
}

/// Closing bumper configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PromoConfig {
    /// Caption shown on the bumper
    #[serde(default = "default_promo_text")]
    pub text: String,

    /// Still image shown; a colour card when unset
    #[serde(default)]
    pub image: Option<PathBuf>,

    #[serde(default = "default_background_color")]
    pub background_color: String,
}

impl Default for PromoConfig {
    fn default() -> Self {
        Self {
            text: default_promo_text(),
            image: None,
            background_color: default_background_color(),
        }
    }
}

/// Encoder and output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// x264 preset
    #[serde(default = "default_preset")]
    pub preset: String,

    /// File name used when no title is given
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            preset: default_preset(),
            default_filename: default_filename(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_voice() -> String {
    crate::voices::default_voice().id.to_string()
}

fn default_endpoint() -> String {
    crate::providers::google_tts::DEFAULT_ENDPOINT.to_string()
}

fn default_language_code() -> String {
    "es-ES".to_string()
}

fn default_sample_rate_hertz() -> u32 {
    24_000
}

fn default_speaking_rate() -> f64 {
    1.0
}

fn default_max_chars_per_request() -> usize {
    crate::pipeline::DEFAULT_MAX_CHARS
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_extensions() -> Vec<String> {
    vec!["mp4".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    0.85
}

fn default_font_size_ratio() -> f64 {
    0.05
}

fn default_max_caption_chars() -> usize {
    crate::segmenter::DEFAULT_MAX_CAPTION_CHARS
}

fn default_max_line_chars() -> usize {
    42
}

fn default_font_color() -> String {
    "white".to_string()
}

fn default_box_color() -> String {
    "black".to_string()
}

fn default_promo_text() -> String {
    "¡Suscríbete!".to_string()
}

fn default_background_color() -> String {
    "black".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_filename() -> String {
    "video_output.mp4".to_string()
}

impl Config {
    /// Load the configuration at `path`, writing a default one first if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path).context(format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let voice = crate::voices::resolve_voice(&self.voice)?;
        crate::voices::get_language_name(&self.synthesis.language_code)?;
        if !voice
            .language_code()
            .eq_ignore_ascii_case(&self.synthesis.language_code)
        {
            return Err(anyhow!(
                "Voice {} does not speak the configured language {}",
                voice.id,
                self.synthesis.language_code
            ));
        }

        let synthesis = &self.synthesis;
        if synthesis.provider == SynthesisProvider::Google && synthesis.get_api_key().is_empty() {
            return Err(anyhow!(
                "Synthesis API key is required for the Google provider (set synthesis.api_key or {})",
                API_KEY_ENV
            ));
        }
        if synthesis.max_chars_per_request == 0 {
            return Err(anyhow!("synthesis.max_chars_per_request must be greater than zero"));
        }
        if synthesis.sample_rate_hertz == 0 {
            return Err(anyhow!("synthesis.sample_rate_hertz must be greater than zero"));
        }
        if !(0.25..=4.0).contains(&synthesis.speaking_rate) {
            return Err(anyhow!(
                "synthesis.speaking_rate must be between 0.25 and 4.0, got {}",
                synthesis.speaking_rate
            ));
        }
        if synthesis.max_backoff_ms < synthesis.retry_backoff_ms {
            return Err(anyhow!("synthesis.max_backoff_ms must not be below synthesis.retry_backoff_ms"));
        }

        if self.footage.extensions.is_empty() {
            return Err(anyhow!("footage.extensions must list at least one extension"));
        }
        if !self.footage.fixed_offset_secs.is_finite() || self.footage.fixed_offset_secs < 0.0 {
            return Err(anyhow!("footage.fixed_offset_secs must be a non-negative number"));
        }

        let captions = &self.captions;
        if !(captions.opacity > 0.0 && captions.opacity < 1.0) {
            return Err(anyhow!(
                "captions.opacity must be strictly between 0 and 1, got {}",
                captions.opacity
            ));
        }
        if !(captions.font_size_ratio > 0.0 && captions.font_size_ratio <= 0.5) {
            return Err(anyhow!("captions.font_size_ratio must be in (0, 0.5]"));
        }
        if captions.max_caption_chars == 0 || captions.max_line_chars == 0 {
            return Err(anyhow!("captions.max_caption_chars and captions.max_line_chars must be greater than zero"));
        }

        if let Some(image) = &self.promo.image {
            if !image.is_file() {
                return Err(anyhow!("promo.image does not exist: {:?}", image));
            }
        }
        if self.output.default_filename.trim().is_empty() {
            return Err(anyhow!("output.default_filename must not be empty"));
        }

        Ok(())
    }

    /// Voice id with any display suffix removed
    pub fn voice_id(&self) -> String {
        crate::voices::normalize_voice(&self.voice).to_string()
    }

    /// Fixed encoding parameters with the configured preset
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            preset: self.output.preset.clone(),
            ..EncodeSettings::default()
        }
    }

    /// Everything the pipeline needs from the configuration
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_chars: self.synthesis.max_chars_per_request,
            max_caption_chars: self.captions.max_caption_chars,
            retry: self.synthesis.retry_policy(),
            selection: self.footage.policy,
            trim: self.footage.trim_mode(),
            seed: self.footage.seed,
            assembly: AssemblyOptions {
                captions: self.captions.enabled,
                promo: PromoOptions {
                    text: self.promo.text.clone(),
                    image: self.promo.image.clone(),
                    background_color: self.promo.background_color.clone(),
                },
            },
            encode: self.encode_settings(),
            temp_dir: self.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            voice: default_voice(),
            log_level: LogLevel::default(),
            temp_dir: None,
            synthesis: SynthesisConfig::default(),
            footage: FootageConfig::default(),
            captions: CaptionConfig::default(),
            promo: PromoConfig::default(),
            output: OutputConfig::default(),
        }
    }
}
