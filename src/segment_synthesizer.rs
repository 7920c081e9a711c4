use std::path::Path;

use log::debug;

use crate::audio::{write_wav, AudioAsset};
use crate::book_metadata::BookMetadata;
use crate::errors::PipelineError;
use crate::sentence_streamer::TextChunk;
use crate::synthesis::SpeechSynthesizer;

// @module: Per-chunk synthesis and persistence

/// File stem of the introduction asset
pub const INTRODUCTION_STEM: &str = "introduction";

/// Drives the speech engine and persists one WAV per chunk
#[derive(Debug)]
pub struct SegmentSynthesizer<'a> {
    engine: &'a dyn SpeechSynthesizer,
}

impl<'a> SegmentSynthesizer<'a> {
    pub fn new(engine: &'a dyn SpeechSynthesizer) -> Self {
        Self { engine }
    }

    /// Synthesize one chunk into `output_dir/NNNNNN.wav`
    pub async fn synthesize_chunk(
        &self,
        chunk: &TextChunk,
        voice: &str,
        output_dir: &Path,
    ) -> Result<AudioAsset, PipelineError> {
        self.synthesize_named(&chunk.file_stem(), &chunk.text, voice, output_dir).await
    }

    /// Synthesize the book greeting into `output_dir/introduction.wav`
    pub async fn synthesize_introduction(
        &self,
        metadata: &BookMetadata,
        voice: &str,
        output_dir: &Path,
    ) -> Result<AudioAsset, PipelineError> {
        metadata.validate()?;
        let text = metadata.introduction_text();
        self.synthesize_named(INTRODUCTION_STEM, &text, voice, output_dir).await
    }

    async fn synthesize_named(
        &self,
        stem: &str,
        text: &str,
        voice: &str,
        output_dir: &Path,
    ) -> Result<AudioAsset, PipelineError> {
        let audio = self
            .engine
            .synthesize(text, voice)
            .await
            .map_err(|source| PipelineError::Synthesis { chunk: stem.to_string(), source })?;

        // Zero frames would leave a hole in every later offset
        if audio.is_empty() || audio.sample_rate == 0 {
            return Err(PipelineError::Synthesis {
                chunk: stem.to_string(),
                source: crate::errors::SynthesisError::NoAudio,
            });
        }

        std::fs::create_dir_all(output_dir)
            .map_err(|e| PipelineError::MergeIo(format!("Cannot create {}: {}", output_dir.display(), e)))?;
        let path = output_dir.join(format!("{}.wav", stem));
        write_wav(&path, &audio)?;

        let duration = audio.duration_secs();
        debug!("{} ({}): {:.3}s via {}", stem, path.display(), duration, self.engine.name());

        Ok(AudioAsset::new(path, duration, text.to_string()))
    }
}
