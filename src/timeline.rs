/*!
 * Subtitle timeline builder.
 *
 * Each asset's text is wrapped into display lines and the asset's duration is
 * split evenly across them. Asset k starts at `start_offset + offset(k)`, the
 * same prefix sum the merge engine uses, so a chapter timeline built here is
 * identical to merging per-chunk timelines.
 */

use std::path::Path;

use log::debug;

use crate::audio::{wav_duration, AudioAsset};
use crate::errors::PipelineError;
use crate::manifest::Manifest;
use crate::merge::compute_offsets;
use crate::subtitle_processor::{CaptionTrack, SubtitleEntry};

/// Default caption line width in characters
pub const DEFAULT_MAX_LINE_WIDTH: usize = 80;

/// Greedy word wrap; words longer than `width` are split into pieces
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        // Break oversized words, filling the current line first
        while word.len() > width {
            let room = if current_len == 0 { width } else { width.saturating_sub(current_len + 1) };
            if room == 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            let head: String = word.drain(..room).collect();
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(&head);
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Builds caption tracks from timed assets
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    max_line_width: usize,
}

impl Default for TimelineBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_WIDTH)
    }
}

impl TimelineBuilder {
    pub fn new(max_line_width: usize) -> Self {
        Self { max_line_width }
    }

    /// Caption track for `assets` in order, clock starting at `start_offset`
    pub fn build(&self, assets: &[AudioAsset], start_offset: f64) -> Result<CaptionTrack, PipelineError> {
        let durations: Vec<f64> = assets.iter().map(|a| a.duration_seconds).collect();
        let offsets = compute_offsets(&durations);
        let mut track = CaptionTrack::new();

        for (asset, offset) in assets.iter().zip(offsets) {
            let duration = asset.duration_seconds;
            if !(duration.is_finite() && duration > 0.0) {
                return Err(PipelineError::TimingInconsistency(format!(
                    "{} has no usable duration ({})",
                    asset.path.display(),
                    duration
                )));
            }

            let lines = wrap_text(&asset.source_text, self.max_line_width);
            if lines.is_empty() {
                return Err(PipelineError::Input(format!(
                    "{} has no caption text",
                    asset.path.display()
                )));
            }

            let count = lines.len() as f64;
            if duration / count < 0.001 {
                return Err(PipelineError::TimingInconsistency(format!(
                    "{} is too short ({}s) for {} caption lines",
                    asset.path.display(),
                    duration,
                    lines.len()
                )));
            }

            let base = start_offset + offset;
            // Same sum the next asset's base is built from, so no gap opens between assets
            let next_base = start_offset + (offset + duration);
            let last = lines.len() - 1;
            for (j, line) in lines.into_iter().enumerate() {
                let start = base + duration * j as f64 / count;
                let end = if j == last { next_base } else { base + duration * (j + 1) as f64 / count };
                let seq_num = track.len() + 1;
                track.entries.push(SubtitleEntry::from_seconds(seq_num, start, end, line));
            }
        }

        debug!("Built {} cues for {} assets", track.len(), assets.len());
        Ok(track)
    }

    /// Build from a manifest, measuring every referenced asset on disk
    pub fn build_from_manifest(&self, manifest_path: &Path, audio_dir: &Path) -> Result<CaptionTrack, PipelineError> {
        let manifest = Manifest::load(manifest_path)?;
        let assets = manifest
            .entries
            .iter()
            .map(|entry| {
                let path = audio_dir.join(&entry.audio);
                let duration = wav_duration(&path)?;
                if duration <= 0.0 {
                    return Err(PipelineError::TimingInconsistency(format!(
                        "{} has zero duration",
                        path.display()
                    )));
                }
                Ok(AudioAsset::new(path, duration, entry.text.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.build(&assets, 0.0)
    }
}
