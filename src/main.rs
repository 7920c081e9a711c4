// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::PathBuf;
use std::io::Write;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use narrata::app_config::{self, Config, SynthesisProvider};
use narrata::{BookReport, Controller};

/// CLI Wrapper for SynthesisProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSynthesisProvider {
    Http,
    Command,
}

impl From<CliSynthesisProvider> for SynthesisProvider {
    fn from(cli_provider: CliSynthesisProvider) -> Self {
        match cli_provider {
            CliSynthesisProvider::Http => SynthesisProvider::Http,
            CliSynthesisProvider::Command => SynthesisProvider::Command,
        }
    }
}

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
    /// Narrate a book from its chapter text files (default command)
    Narrate(NarrateArgs),

    /// Merge existing introduction and chapter outputs into the audiobook
    Merge(MergeArgs),

    /// Generate shell completions for narrata
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct NarrateArgs {
    /// Directory holding the chapter text files
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Book metadata JSON (Title, Author, Translator)
    #[arg(long, default_value = "metadata.json")]
    metadata: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Voice identifier passed to the engine
    #[arg(short, long)]
    voice: Option<String>,

    /// Speech engine to use
    #[arg(short, long, value_enum)]
    provider: Option<CliSynthesisProvider>,

    /// Force overwrite of existing chapter outputs
    #[arg(short, long)]
    force_overwrite: bool,

    /// Stop after the per-chapter outputs, without the audiobook merge
    #[arg(long)]
    chapters_only: bool,

    /// Keep chunk WAVs and manifests after merging
    #[arg(long)]
    keep_intermediates: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct MergeArgs {
    /// Output directory of a previous narration run
    #[arg(value_name = "OUTPUT_DIR", default_value = "output")]
    output: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// narrata - Narrated audiobooks with synchronized captions
///
/// Turns chapter text files into narrated audio and SRT captions using a
/// text-to-speech engine, then merges them into one audiobook.
#[derive(Parser, Debug)]
#[command(name = "narrata")]
#[command(version)]
#[command(about = "Audiobook narration with synchronized captions")]
#[command(long_about = "narrata splits chapter text into speakable chunks, synthesizes each chunk with a
text-to-speech engine and merges the results into chapter and book audio with captions.

EXAMPLES:
    narrata chapters/                              # Narrate using default config
    narrata -f chapters/                           # Re-synthesize existing chapters
    narrata -v bf_emma --metadata book.json ch/    # Pick a voice and metadata file
    narrata -p command chapters/                   # Use the configured local command
    narrata --chapters-only chapters/              # Per-chapter outputs only
    narrata merge output/                          # Rebuild the audiobook from outputs
    narrata completions bash > narrata.bash        # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    http    - OpenAI-compatible /audio/speech endpoint (default: Kokoro on http://localhost:8880/v1)
    command - Local program called with {voice} and {output} placeholders, text on stdin")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the chapter text files
    #[arg(value_name = "INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Book metadata JSON (Title, Author, Translator)
    #[arg(long, default_value = "metadata.json")]
    metadata: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Voice identifier passed to the engine
    #[arg(short, long)]
    voice: Option<String>,

    /// Speech engine to use
    #[arg(short, long, value_enum)]
    provider: Option<CliSynthesisProvider>,

    /// Force overwrite of existing chapter outputs
    #[arg(short, long)]
    force_overwrite: bool,

    /// Stop after the per-chapter outputs, without the audiobook merge
    #[arg(long)]
    chapters_only: bool,

    /// Keep chunk WAVs and manifests after merging
    #[arg(long)]
    keep_intermediates: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
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

    // @returns: Emoji and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
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
            let (emoji, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set via max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "narrata", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Narrate(args)) => run_narrate(args).await,
        Some(Commands::Merge(args)) => run_merge(args),
        None => {
            // Default behavior - top-level args narrate a book
            let input_dir = cli.input_dir.ok_or_else(|| {
                anyhow!("INPUT_DIR is required when no subcommand is specified")
            })?;

            let narrate_args = NarrateArgs {
                input_dir,
                metadata: cli.metadata,
                output: cli.output,
                voice: cli.voice,
                provider: cli.provider,
                force_overwrite: cli.force_overwrite,
                chapters_only: cli.chapters_only,
                keep_intermediates: cli.keep_intermediates,
                config_path: cli.config_path,
                log_level: cli.log_level,
            };
            run_narrate(narrate_args).await
        }
    }
}

/// Load the config file and apply the log level from CLI or config
fn load_config(config_path: &str, log_level: Option<&CliLogLevel>) -> Result<Config> {
    if let Some(level) = log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(config_path)?;

    if let Some(level) = log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

async fn run_narrate(options: NarrateArgs) -> Result<()> {
    let mut config = load_config(&options.config_path, options.log_level.as_ref())?;

    // Override config with CLI options if provided
    if let Some(voice) = &options.voice {
        config.voice = voice.clone();
    }
    if let Some(provider) = &options.provider {
        config.synthesis.provider = provider.clone().into();
    }
    if options.chapters_only {
        config.output.chapters_only = true;
    }
    if options.keep_intermediates {
        config.output.keep_intermediates = true;
    }

    config.validate()
        .context("Configuration validation failed")?;

    if !options.input_dir.is_dir() {
        return Err(anyhow!("Input directory does not exist: {:?}", options.input_dir));
    }

    info!("Using {} engine with voice {}", config.synthesis.provider.display_name(), config.voice);

    let controller = Controller::with_config(config)?;
    let report = controller
        .run_book(&options.input_dir, &options.metadata, &options.output, options.force_overwrite)
        .await?;

    print_summary(&report);
    Ok(())
}

fn run_merge(options: MergeArgs) -> Result<()> {
    let config = load_config(&options.config_path, options.log_level.as_ref())?;
    config.validate()
        .context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let report = controller.merge_existing(&options.output)?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &BookReport) {
    for skipped in &report.skipped {
        warn!("Skipped chapter {}: {}", skipped.name, skipped.reason);
    }

    match (&report.audio, &report.captions) {
        (Some(audio), Some(captions)) => {
            info!("Success: {:?} and {:?}", audio, captions);
        }
        _ => {
            info!("Success: {} chapter outputs written", report.chapters.len());
        }
    }

    if !report.skipped.is_empty() {
        error!("{} chapter(s) were left out of the audiobook", report.skipped.len());
    }
}
