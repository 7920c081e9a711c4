/*!
 * Hierarchical merge engine.
 *
 * The same algorithm joins chunks into a chapter and the introduction plus
 * chapters into a book: audio is concatenated sample-exactly, and caption
 * track k is shifted by `offset(k)`, the summed duration of everything placed
 * before it.
 */

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::audio::{concatenate_wavs, wav_frames, AudioAsset};
use crate::errors::PipelineError;
use crate::subtitle_processor::{seconds_to_ms, CaptionTrack};

/// Largest gap or overlap between a track's last cue and its duration that is
/// treated as truncation error
const TRACK_END_SNAP_MS: u64 = 1;

/// One level-agnostic merge input
#[derive(Debug, Clone)]
pub struct MergeSegment {
    /// Audio file of the segment
    pub audio: PathBuf,
    /// Duration measured from that file
    pub duration_seconds: f64,
    /// Captions timed relative to the segment start
    pub captions: CaptionTrack,
}

/// Prefix sums: `offsets[0] = 0`, `offsets[k] = offsets[k-1] + durations[k-1]`
pub fn compute_offsets(durations: &[f64]) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(durations.len());
    let mut running = 0.0;
    for duration in durations {
        offsets.push(running);
        running += duration;
    }
    offsets
}

/// Concatenate audio files in order into `output`
pub fn merge_audio(ordered_paths: &[PathBuf], output: &Path) -> Result<AudioAsset, PipelineError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| PipelineError::MergeIo(format!("Cannot create {}: {}", parent.display(), e)))?;
    }

    let frames = concatenate_wavs(ordered_paths, output)?;
    let (spec, _) = wav_frames(output)?;
    let duration = frames as f64 / spec.sample_rate as f64;

    info!("Merged {} audio assets into {} ({:.3}s)", ordered_paths.len(), output.display(), duration);
    Ok(AudioAsset::new(output.to_path_buf(), duration, String::new()))
}

/// Track boundaries in whole milliseconds: `boundaries[k]` is where track k
/// starts, `boundaries[k + 1]` where it ends.
///
/// Summed in the same order as `compute_offsets`, so the values match the
/// cue times the timeline builder derives from the same durations.
pub fn boundaries_ms(durations: &[f64]) -> Vec<u64> {
    let mut boundaries = Vec::with_capacity(durations.len() + 1);
    let mut running = 0.0;
    boundaries.push(seconds_to_ms(running));
    for duration in durations {
        running += duration;
        boundaries.push(seconds_to_ms(running));
    }
    boundaries
}

/// Concatenate caption tracks, shifting track k by `offset(k)` and renumbering from 1.
///
/// Shifts are whole milliseconds taken from `boundaries_ms`. A track whose last
/// cue ends within a millisecond of its duration is snapped to the next track's
/// start, so truncation never opens a gap between tracks.
pub fn merge_captions(tracks: &[CaptionTrack], durations: &[f64]) -> Result<CaptionTrack, PipelineError> {
    if tracks.len() != durations.len() {
        return Err(PipelineError::TimingInconsistency(format!(
            "{} caption tracks but {} durations",
            tracks.len(),
            durations.len()
        )));
    }

    let boundaries = boundaries_ms(durations);
    let mut merged = CaptionTrack::new();

    for (k, track) in tracks.iter().enumerate() {
        let (start_ms, end_ms) = (boundaries[k], boundaries[k + 1]);
        let last = track.len().saturating_sub(1);

        for (i, entry) in track.entries.iter().enumerate() {
            let seq_num = merged.len() + 1;
            let mut moved = entry.shifted(seq_num, start_ms);
            if i == last && moved.end_time_ms.abs_diff(end_ms) <= TRACK_END_SNAP_MS {
                moved.end_time_ms = end_ms;
            }
            merged.entries.push(moved);
        }
    }

    debug!("Merged {} caption tracks into {} cues", tracks.len(), merged.len());
    Ok(merged)
}

/// Parse SRT files and merge them with `merge_captions`
pub fn merge_caption_files(srt_paths: &[PathBuf], durations: &[f64]) -> Result<CaptionTrack, PipelineError> {
    let tracks = srt_paths
        .iter()
        .map(CaptionTrack::read_from_srt)
        .collect::<Result<Vec<_>, _>>()?;
    merge_captions(&tracks, durations)
}

/// Merge audio and captions of ordered segments in lockstep
pub fn merge_segments(
    segments: &[MergeSegment],
    audio_output: &Path,
) -> Result<(AudioAsset, CaptionTrack), PipelineError> {
    for segment in segments {
        if !(segment.duration_seconds.is_finite() && segment.duration_seconds > 0.0) {
            return Err(PipelineError::TimingInconsistency(format!(
                "{} has no usable duration ({})",
                segment.audio.display(),
                segment.duration_seconds
            )));
        }
    }

    let paths: Vec<PathBuf> = segments.iter().map(|s| s.audio.clone()).collect();
    let durations: Vec<f64> = segments.iter().map(|s| s.duration_seconds).collect();
    let tracks: Vec<CaptionTrack> = segments.iter().map(|s| s.captions.clone()).collect();

    let captions = merge_captions(&tracks, &durations)?;
    let audio = merge_audio(&paths, audio_output)?;
    Ok((audio, captions))
}
