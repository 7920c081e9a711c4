/*!
 * WAV audio helpers.
 *
 * Chunk assets are written as 16-bit PCM mono WAV at the engine's native
 * sample rate. A RIFF data chunk holds at most 4 GiB, which at 16 bits and
 * 24 kHz is about 24.8 hours of narration. Durations are always measured from frame counts on disk, and
 * concatenation copies samples verbatim, so the duration of a merged file is
 * exactly the sum of its inputs' frame counts.
 */

use std::io::Read;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::errors::{PipelineError, SynthesisError};

/// Decoded audio as returned by a synthesis engine
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Duration of the audio in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One persisted recording
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    /// Location of the WAV file
    pub path: PathBuf,
    /// Realized duration measured from the file
    pub duration_seconds: f64,
    /// Text spoken in this asset (empty for merged assets)
    pub source_text: String,
}

impl AudioAsset {
    pub fn new(path: PathBuf, duration_seconds: f64, source_text: String) -> Self {
        Self { path, duration_seconds, source_text }
    }

    /// File name component, used in manifests
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Decode a WAV stream into mono f32 samples, averaging channels if needed
pub fn decode_wav<R: Read>(reader: R) -> Result<SynthesizedAudio, SynthesisError> {
    let reader = WavReader::new(reader)
        .map_err(|e| SynthesisError::InvalidAudio(format!("Failed to read WAV header: {}", e)))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| SynthesisError::InvalidAudio(e.to_string()))?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| SynthesisError::InvalidAudio(e.to_string()))?
        }
        (format, bits) => {
            return Err(SynthesisError::InvalidAudio(format!(
                "Unsupported sample format: {:?} {} bit",
                format, bits
            )));
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(SynthesizedAudio::new(samples, spec.sample_rate))
}

/// Decode a WAV file from disk
pub fn read_wav(path: &Path) -> Result<SynthesizedAudio, SynthesisError> {
    let file = std::fs::File::open(path)
        .map_err(|e| SynthesisError::InvalidAudio(format!("{}: {}", path.display(), e)))?;
    decode_wav(std::io::BufReader::new(file))
}

/// Largest data chunk a RIFF header can describe
const MAX_DATA_BYTES: u64 = u32::MAX as u64;

/// Write mono f32 samples as a 16-bit PCM WAV
pub fn write_wav(path: &Path, audio: &SynthesizedAudio) -> Result<(), PipelineError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    check_data_size(&spec, audio.samples.len() as u64, path)?;

    let io_err = |e: hound::Error| PipelineError::MergeIo(format!("{}: {}", path.display(), e));

    let mut writer = WavWriter::create(path, spec).map_err(io_err)?;
    for &sample in &audio.samples {
        writer.write_sample(pcm16(sample)).map_err(io_err)?;
    }
    writer.finalize().map_err(io_err)?;
    Ok(())
}

/// Quantize a float sample to 16-bit PCM
fn pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Reject outputs whose data chunk would overflow the 32-bit RIFF size
pub(crate) fn check_data_size(spec: &WavSpec, frames: u64, output: &Path) -> Result<(), PipelineError> {
    let bytes = frames * spec.channels as u64 * (spec.bits_per_sample as u64 / 8);
    if bytes > MAX_DATA_BYTES {
        return Err(PipelineError::MergeIo(format!(
            "{} would hold {} frames ({} bytes), more than a WAV file can address",
            output.display(),
            frames,
            bytes
        )));
    }
    Ok(())
}

/// Measure a WAV file's duration in seconds from its frame count
pub fn wav_duration(path: &Path) -> Result<f64, PipelineError> {
    let (spec, frames) = wav_frames(path)?;
    if spec.sample_rate == 0 {
        return Err(PipelineError::TimingInconsistency(format!(
            "{} declares a zero sample rate",
            path.display()
        )));
    }
    Ok(frames as f64 / spec.sample_rate as f64)
}

/// Spec and frame count of a WAV file
pub fn wav_frames(path: &Path) -> Result<(WavSpec, u32), PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::TimingInconsistency(format!(
            "Audio asset is missing: {}",
            path.display()
        )));
    }
    let reader = WavReader::open(path)
        .map_err(|e| PipelineError::MergeIo(format!("Failed to open {}: {}", path.display(), e)))?;
    Ok((reader.spec(), reader.duration()))
}

/// Concatenate WAV files sample by sample into `output`.
///
/// Every input must share the first input's spec, and the combined data must
/// fit one RIFF data chunk. Both are checked before `output` is created.
pub fn concatenate_wavs(inputs: &[PathBuf], output: &Path) -> Result<u64, PipelineError> {
    let first = inputs
        .first()
        .ok_or_else(|| PipelineError::MergeIo("No audio assets to concatenate".to_string()))?;
    let (spec, _) = wav_frames(first)?;

    let mut total_frames: u64 = 0;
    for input in inputs {
        let (input_spec, frames) = wav_frames(input)?;
        if input_spec != spec {
            return Err(PipelineError::MergeIo(format!(
                "{} has format {:?}, expected {:?}",
                input.display(),
                input_spec,
                spec
            )));
        }
        total_frames += frames as u64;
    }
    check_data_size(&spec, total_frames, output)?;

    let io_err = |e: hound::Error| PipelineError::MergeIo(format!("{}: {}", output.display(), e));
    let mut writer = WavWriter::create(output, spec).map_err(io_err)?;

    for input in inputs {
        let reader = WavReader::open(input)
            .map_err(|e| PipelineError::MergeIo(format!("Failed to open {}: {}", input.display(), e)))?;

        let read_err = |e: hound::Error| PipelineError::MergeIo(format!("{}: {}", input.display(), e));
        match spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.into_samples::<f32>() {
                    writer.write_sample(sample.map_err(read_err)?).map_err(io_err)?;
                }
            }
            SampleFormat::Int => {
                for sample in reader.into_samples::<i32>() {
                    writer.write_sample(sample.map_err(read_err)?).map_err(io_err)?;
                }
            }
        }
    }

    writer.finalize().map_err(io_err)?;
    debug!("Concatenated {} files ({} frames) into {}", inputs.len(), total_frames, output.display());
    Ok(total_frames)
}
