use std::fmt;
use std::fs;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::debug;

use crate::errors::PipelineError;

// @module: Caption cues, caption tracks and the SRT codec

// @const: SRT time range line, hours may run past two digits
static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}:\d{2}:\d{2},\d{3}) --> (\d{2,}:\d{2}:\d{2},\d{3})$").unwrap()
});

/// Tolerance (in ms) added before truncating so that values such as
/// 0.57 s, stored as 0.569999..., still land on 570 ms.
const TRUNCATION_GUARD_MS: f64 = 1e-3;

/// Convert fractional seconds to whole milliseconds, truncating.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0 + TRUNCATION_GUARD_MS).floor() as u64
}

// @struct: Single caption cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Cue text
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry without validation
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range and non-empty text
    pub fn new_validated(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Result<Self> {
        if end_time_ms <= start_time_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} <= start time {}",
                end_time_ms, start_time_ms
            ));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty subtitle text for entry {}", seq_num));
        }

        Ok(SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: trimmed_text.to_string(),
        })
    }

    /// Create a cue from fractional-second bounds, truncating both to milliseconds
    pub fn from_seconds(seq_num: usize, start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self::new(seq_num, seconds_to_ms(start_seconds), seconds_to_ms(end_seconds), text)
    }

    /// Copy of this cue moved later by `offset_ms` and renumbered
    pub fn shifted(&self, seq_num: usize, offset_ms: u64) -> Self {
        Self::new(
            seq_num,
            self.start_time_ms + offset_ms,
            self.end_time_ms + offset_ms,
            self.text.clone(),
        )
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        // HH:MM:SS,mmm with an unbounded hour field
        let parts: Vec<&str> = timestamp.trim().split(&[':', ','][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm).
    /// Hours are never wrapped, so long books render e.g. `125:00:00,000`.
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)
    }
}

/// Ordered caption track; insertion order is playback order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionTrack {
    /// Cues in playback order
    pub entries: Vec<SubtitleEntry>,
}

impl CaptionTrack {
    /// Create an empty track
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already ordered entries
    pub fn from_entries(entries: Vec<SubtitleEntry>) -> Self {
        CaptionTrack { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the last cue in milliseconds (0 for an empty track)
    pub fn end_time_ms(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.end_time_ms)
    }

    /// Render the whole track in SRT form
    pub fn to_srt_string(&self) -> String {
        self.to_string()
    }

    /// Write the track to an SRT file, creating parent directories
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(path, self.to_srt_string())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        debug!("Wrote {} cues to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Load a track from an SRT file; see `parse_srt_string` for what is rejected
    pub fn read_from_srt<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| PipelineError::MergeIo(format!("Failed to read subtitle file {}: {}", path.display(), e)))?;
        let entries = Self::parse_srt_string(&content).map_err(|e| match e {
            PipelineError::TimingInconsistency(msg) => {
                PipelineError::TimingInconsistency(format!("{}: {}", path.display(), msg))
            }
            PipelineError::Input(msg) => PipelineError::Input(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        Ok(Self::from_entries(entries))
    }

    /// Parse SRT content into cues, in file order.
    ///
    /// Parsing is all or nothing: a cue without a number or text is an `Input`
    /// error, and a malformed or empty time range, or a cue starting before the
    /// previous one ends, is a `TimingInconsistency`. Cues are never dropped,
    /// reordered or renumbered.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, PipelineError> {
        let mut entries: Vec<SubtitleEntry> = Vec::new();
        let mut block: Vec<(usize, &str)> = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                block.push((index + 1, trimmed));
                continue;
            }
            if !block.is_empty() {
                let entry = Self::parse_cue(&block, entries.last())?;
                entries.push(entry);
                block.clear();
            }
        }
        if !block.is_empty() {
            let entry = Self::parse_cue(&block, entries.last())?;
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(PipelineError::Input("No subtitle entries were found in the SRT content".to_string()));
        }
        Ok(entries)
    }

    /// One blank-line separated block: number, time range, text lines
    fn parse_cue(block: &[(usize, &str)], previous: Option<&SubtitleEntry>) -> Result<SubtitleEntry, PipelineError> {
        let (line_no, number) = block[0];
        let seq_num: usize = number.parse().map_err(|_| {
            PipelineError::Input(format!("Line {}: expected a cue number, found {:?}", line_no, number))
        })?;

        let Some(&(range_line_no, range)) = block.get(1) else {
            return Err(PipelineError::TimingInconsistency(format!("Cue {} has no time range", seq_num)));
        };
        let timing_error = |detail: String| {
            PipelineError::TimingInconsistency(format!("Line {}: cue {} {}", range_line_no, seq_num, detail))
        };
        let caps = TIME_RANGE_REGEX
            .captures(range)
            .ok_or_else(|| timing_error(format!("has a malformed time range {:?}", range)))?;
        let start_ms = SubtitleEntry::parse_timestamp(&caps[1]).map_err(|e| timing_error(e.to_string()))?;
        let end_ms = SubtitleEntry::parse_timestamp(&caps[2]).map_err(|e| timing_error(e.to_string()))?;
        if end_ms <= start_ms {
            return Err(timing_error(format!("ends at {} but starts at {}", end_ms, start_ms)));
        }

        let text = block[2..].iter().map(|(_, text)| *text).collect::<Vec<_>>().join("\n");
        let entry = SubtitleEntry::new_validated(seq_num, start_ms, end_ms, text)
            .map_err(|e| PipelineError::Input(format!("Line {}: {}", line_no, e)))?;

        if let Some(previous) = previous {
            if entry.start_time_ms < previous.end_time_ms {
                return Err(timing_error(format!(
                    "starts at {} before cue {} ends at {}",
                    entry.start_time_ms, previous.seq_num, previous.end_time_ms
                )));
            }
        }
        Ok(entry)
    }
}

impl fmt::Display for CaptionTrack {
    /// Cues are separated by a single blank line; the output ends with one newline.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}
