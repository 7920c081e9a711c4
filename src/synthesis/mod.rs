/*!
 * Speech synthesis engines.
 *
 * The pipeline only sees the `SpeechSynthesizer` trait, so engines are
 * interchangeable and tests can substitute the deterministic mock:
 * - `http`: OpenAI-compatible `/audio/speech` endpoint (e.g. a Kokoro server)
 * - `command`: a local program that writes a WAV file
 * - `mock`: fixed-duration stand-in with scripted failures
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::app_config::{SynthesisConfig, SynthesisProvider};
use crate::audio::SynthesizedAudio;
use crate::errors::SynthesisError;

/// Common trait for all speech engines
///
/// Implementations are treated as a single stateful resource: the pipeline
/// never calls `synthesize` concurrently on one instance.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    /// Render `text` with `voice` into mono samples
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedAudio, SynthesisError>;

    /// Engine name for logs
    fn name(&self) -> &str;
}

/// Build the engine selected in the configuration
pub fn create_synthesizer(config: &SynthesisConfig) -> Result<Box<dyn SpeechSynthesizer>, SynthesisError> {
    match config.provider {
        SynthesisProvider::Http => Ok(Box::new(http::HttpSynthesizer::new(
            &config.endpoint,
            &config.model,
            &config.api_key,
            config.timeout_secs,
        )?)),
        SynthesisProvider::Command => Ok(Box::new(command::CommandSynthesizer::new(
            &config.command,
            config.args.clone(),
            config.timeout_secs,
        ))),
    }
}

pub mod command;
pub mod http;
pub mod mock;
