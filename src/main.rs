// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use textreel::app_config::{self, Config};
use textreel::app_controller::{load_narration, Controller, GenerateOptions, RunOutcome};
use textreel::footage::SelectionPolicy;
use textreel::voices;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a narrated video from text
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// List the available narration voices
    Voices,

    /// Generate shell completions for textreel
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Narration text
    #[arg(value_name = "TEXT", required_unless_present = "text_file")]
    text: Option<String>,

    /// Read the narration text from a file
    #[arg(long, value_name = "FILE", conflicts_with = "text")]
    text_file: Option<PathBuf>,

    /// Video title, used as the output file name
    #[arg(short = 'T', long)]
    title: Option<String>,

    /// Narration voice id, e.g. es-ES-Neural2-A
    #[arg(short, long)]
    voice: Option<String>,

    /// Background clip to use; repeat to select several
    #[arg(short, long = "clip", value_name = "CLIP")]
    clips: Vec<PathBuf>,

    /// Folder holding the background clips
    #[arg(short = 'd', long, value_name = "DIR")]
    footage_dir: Option<PathBuf>,

    /// Folder receiving the video
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'C', long = "config", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Pick background clips at random instead of in order
    #[arg(short, long)]
    random_footage: bool,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,
}

/// textreel - narrated videos from text
///
/// Splits text into speakable chunks, synthesizes each one, lays the narration
/// over background footage with burned-in captions, and closes with a
/// subscribe bumper.
#[derive(Parser, Debug)]
#[command(name = "textreel")]
#[command(version)]
#[command(about = "Narrated videos from text")]
#[command(long_about = "textreel turns narration text into a captioned video over background footage.

EXAMPLES:
    textreel generate \"Hola. Mundo.\" -d clips/ -o out/          # Use every clip in clips/
    textreel generate --text-file guion.txt -d clips/ -o out/ -T \"Mi video\"
    textreel generate \"Hola.\" -c a.mp4 -c b.mp4 -o out/ -r       # Random order over two clips
    textreel voices                                             # List narration voices
    textreel completions bash > textreel.bash                   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. The synthesis API key may also be given in
    the GOOGLE_TTS_API_KEY environment variable.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    // @returns: Marker for log level
    fn marker_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "✗",
            Level::Warn => "!",
            Level::Info => " ",
            Level::Debug => "·",
            Level::Trace => "…",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::marker_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install the logger with the widest level; the effective level is set after the config loads
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "textreel", &mut std::io::stdout());
            Ok(())
        }
        Commands::Voices => {
            print_voices();
            Ok(())
        }
        Commands::Generate(args) => run_generate(args).await,
    }
}

fn print_voices() {
    let default_id = voices::default_voice().id;
    for voice in voices::VOICES.iter() {
        let language = voices::get_native_language_name(voice.language_code())
            .unwrap_or_else(|_| voice.language_code().to_string());
        let marker = if voice.id == default_id { " (default)" } else { "" };
        println!("{:<28} {:<10} {}{}", voice.display_name(), language, voice.language_code(), marker);
    }
}

async fn run_generate(options: GenerateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(voice) = &options.voice {
        config.voice = voice.clone();
    }
    if options.random_footage {
        config.footage.policy = SelectionPolicy::Random;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let text = load_narration(options.text, options.text_file.as_deref())?;
    info!("Narrating with voice {}", config.voice_id());

    let controller = Controller::with_config(config)?;
    let outcome = controller
        .run(GenerateOptions {
            text,
            title: options.title,
            clips: options.clips,
            footage_dir: options.footage_dir,
            output_dir: options.output_dir,
            force_overwrite: options.force_overwrite,
        })
        .await?;

    match outcome {
        RunOutcome::Generated(report) => info!("Success: {:?}", report.output),
        RunOutcome::Skipped(path) => info!("Nothing to do, {:?} already exists", path),
    }

    Ok(())
}
