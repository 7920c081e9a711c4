use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Application configuration module
/// This module handles loading, validating and saving the narration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Voice identifier passed through to the engine
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speech engine settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Caption layout settings
    #[serde(default)]
    pub subtitles: SubtitleConfig,

    /// Sentence chunking settings
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Output handling
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Speech engine type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisProvider {
    // @provider: OpenAI-compatible speech endpoint (e.g. a Kokoro server)
    #[default]
    Http,
    // @provider: Local program writing a WAV file
    Command,
}

impl SynthesisProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Http => "HTTP",
            Self::Command => "Command",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Http => "http".to_string(),
            Self::Command => "command".to_string(),
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
            "http" => Ok(Self::Http),
            "command" => Ok(Self::Command),
            _ => Err(anyhow!("Invalid synthesis provider: {}", s)),
        }
    }
}

/// Speech engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// Engine type to use
    #[serde(default)]
    pub provider: SynthesisProvider,

    /// Base URL of the speech API (http provider)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name sent to the speech API (http provider)
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token, empty for local servers
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Program to run (command provider)
    #[serde(default = "default_command")]
    pub command: String,

    /// Program arguments; `{voice}` and `{output}` are substituted
    #[serde(default = "default_command_args")]
    pub args: Vec<String>,

    /// Per-chunk timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: SynthesisProvider::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: String::new(),
            command: default_command(),
            args: default_command_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Configuration for caption layout
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubtitleConfig {
    /// Maximum characters per caption line
    #[serde(default = "default_max_line_width")]
    pub max_line_width: usize,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            max_line_width: default_max_line_width(),
        }
    }
}

/// Configuration for sentence chunking
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Seed for the 2-or-3 sentence draw; the same seed gives the same chunks
    #[serde(default = "default_chunk_seed")]
    pub seed: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            seed: default_chunk_seed(),
        }
    }
}

/// Configuration for output handling
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OutputConfig {
    /// Keep chunk WAVs and manifests after the chapter merge
    #[serde(default)]
    pub keep_intermediates: bool,

    /// Stop after chapter outputs, without the book merge
    #[serde(default)]
    pub chapters_only: bool,
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
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_voice() -> String {
    "af_heart".to_string()
}

fn default_endpoint() -> String {
    // Kokoro-FastAPI default port
    "http://localhost:8880/v1".to_string()
}

fn default_model() -> String {
    "kokoro".to_string()
}

fn default_command() -> String {
    "piper".to_string()
}

fn default_command_args() -> Vec<String> {
    vec![
        "--model".to_string(),
        "{voice}".to_string(),
        "--output_file".to_string(),
        "{output}".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_line_width() -> usize {
    80
}

fn default_chunk_seed() -> u64 {
    0x5eed_b00c
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.voice.trim().is_empty() {
            return Err(anyhow!("A voice identifier is required"));
        }

        if self.subtitles.max_line_width == 0 {
            return Err(anyhow!("subtitles.max_line_width must be greater than zero"));
        }

        if self.synthesis.timeout_secs == 0 {
            return Err(anyhow!("synthesis.timeout_secs must be greater than zero"));
        }

        match self.synthesis.provider {
            SynthesisProvider::Http => {
                url::Url::parse(&self.synthesis.endpoint)
                    .with_context(|| format!("Invalid synthesis endpoint: {}", self.synthesis.endpoint))?;
            }
            SynthesisProvider::Command => {
                if self.synthesis.command.trim().is_empty() {
                    return Err(anyhow!("synthesis.command is required for the command provider"));
                }
                if !self.synthesis.args.iter().any(|a| a.contains("{output}")) {
                    return Err(anyhow!("synthesis.args must contain an {{output}} placeholder"));
                }
            }
        }

        Ok(())
    }

    /// Load a configuration file, writing a default one when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            voice: default_voice(),
            synthesis: SynthesisConfig::default(),
            subtitles: SubtitleConfig::default(),
            chunking: ChunkingConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
