/*!
 * Tests for caption cues, caption tracks and the SRT codec
 */

use std::fmt::Write;
use anyhow::Result;
use narrata::subtitle_processor::{seconds_to_ms, CaptionTrack, SubtitleEntry};
use narrata::PipelineError;
use crate::common;

/// Test timestamp parsing and formatting
#[test]
fn test_timestamp_parsing_withValidTimestamp_shouldParseAndFormat() {
    let ts = "01:23:45,678";
    let ms = SubtitleEntry::parse_timestamp(ts).unwrap();
    assert_eq!(ms, 5025678);

    let formatted = SubtitleEntry::format_timestamp(ms);
    assert_eq!(formatted, ts);
}

/// Out-of-range components are rejected
#[test]
fn test_timestamp_parsing_withInvalidMinutes_shouldFail() {
    assert!(SubtitleEntry::parse_timestamp("00:61:00,000").is_err());
    assert!(SubtitleEntry::parse_timestamp("00:00:00").is_err());
}

/// Test subtitle entry display formatting
#[test]
fn test_subtitle_entry_display_withValidEntry_shouldFormatCorrectly() {
    let entry = SubtitleEntry::new(1, 5000, 10000, "Test subtitle".to_string());
    let mut output = String::new();
    write!(output, "{}", entry).unwrap();

    assert_eq!(output, "1\n00:00:05,000 --> 00:00:10,000\nTest subtitle\n");
}

/// Test subtitle entry properties and methods
#[test]
fn test_subtitle_entry_properties_withValidEntry_shouldHaveCorrectValues() {
    let entry = SubtitleEntry::new(42, 61234, 65432, "Hello".to_string());

    assert_eq!(entry.seq_num, 42);
    assert_eq!(entry.format_start_time(), "00:01:01,234");
    assert_eq!(entry.format_end_time(), "00:01:05,432");
    assert_eq!(entry.shifted(7, 1000).start_time_ms, 62234);
}

/// Validation rejects empty ranges and blank text
#[test]
fn test_new_validated_withInvalidEntries_shouldFail() {
    assert!(SubtitleEntry::new_validated(1, 1000, 1000, "x".to_string()).is_err());
    assert!(SubtitleEntry::new_validated(1, 0, 1000, "   ".to_string()).is_err());
    assert!(SubtitleEntry::new_validated(1, 0, 1000, " ok ".to_string()).is_ok());
}

/// Fractional seconds are truncated, not rounded
#[test]
fn test_from_seconds_shouldTruncateMilliseconds() {
    let entry = SubtitleEntry::from_seconds(1, 1.9999, 2.0006, "x".to_string());
    assert_eq!(entry.start_time_ms, 1999);
    assert_eq!(entry.end_time_ms, 2000);
    assert_eq!(seconds_to_ms(f64::NAN), 0);
}

/// Track rendering separates cues by one blank line
#[test]
fn test_to_srt_string_withTwoCues_shouldSeparateByBlankLine() {
    let track = CaptionTrack::from_entries(vec![
        SubtitleEntry::new(1, 0, 1000, "First".to_string()),
        SubtitleEntry::new(2, 1000, 2500, "Second".to_string()),
    ]);

    assert_eq!(
        track.to_srt_string(),
        "1\n00:00:00,000 --> 00:00:01,000\nFirst\n\n2\n00:00:01,000 --> 00:00:02,500\nSecond\n"
    );
}

/// Parsing and re-serializing a generated track is byte-identical
#[test]
fn test_parse_srt_string_withGeneratedTrack_shouldRoundTripExactly() -> Result<()> {
    let track = CaptionTrack::from_entries(vec![
        SubtitleEntry::new(1, 0, 1333, "It was a quiet morning.".to_string()),
        SubtitleEntry::new(2, 1333, 2666, "The river ran slowly.".to_string()),
        SubtitleEntry::new(3, 2666, 4000, "Nobody spoke!".to_string()),
    ]);
    let rendered = track.to_srt_string();

    let parsed = CaptionTrack::from_entries(CaptionTrack::parse_srt_string(&rendered)?);
    assert_eq!(parsed, track);
    assert_eq!(parsed.to_srt_string(), rendered);
    Ok(())
}

/// Parsing tolerates CRLF line endings and keeps file numbering
#[test]
fn test_parse_srt_string_withCrlf_shouldParseInFileOrder() -> Result<()> {
    let content = "3\r\n00:00:01,000 --> 00:00:02,000\r\nEarlier\r\n\r\n7\r\n00:00:05,000 --> 00:00:06,000\r\nLater\r\n";
    let entries = CaptionTrack::parse_srt_string(content)?;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "Earlier");
    assert_eq!(entries[0].seq_num, 3);
    assert_eq!(entries[1].seq_num, 7);
    Ok(())
}

/// A cue with an empty time range fails the whole parse instead of vanishing
#[test]
fn test_parse_srt_string_withZeroLengthCue_shouldBeTimingInconsistency() {
    let content = "1\n00:00:00,000 --> 00:00:01,000\nA\n\n2\n00:00:01,000 --> 00:00:01,000\nB\n\n3\n00:00:01,000 --> 00:00:02,000\nC\n";
    let result = CaptionTrack::parse_srt_string(content);
    assert!(matches!(result, Err(PipelineError::TimingInconsistency(_))));
}

/// Cues out of playback order are rejected, not re-sorted
#[test]
fn test_parse_srt_string_withUnorderedCues_shouldBeTimingInconsistency() {
    let content = "1\n00:00:05,000 --> 00:00:06,000\nLater\n\n2\n00:00:01,000 --> 00:00:02,000\nEarlier\n";
    let result = CaptionTrack::parse_srt_string(content);
    assert!(matches!(result, Err(PipelineError::TimingInconsistency(_))));
}

/// Malformed time lines and out-of-range components are timing errors
#[test]
fn test_parse_srt_string_withMalformedTimeRange_shouldBeTimingInconsistency() {
    let garbled = "1\n00:00:00,000 -> 00:00:01,000\nA\n";
    let out_of_range = "1\n00:00:00,000 --> 00:61:00,000\nA\n";
    assert!(matches!(CaptionTrack::parse_srt_string(garbled), Err(PipelineError::TimingInconsistency(_))));
    assert!(matches!(CaptionTrack::parse_srt_string(out_of_range), Err(PipelineError::TimingInconsistency(_))));
}

/// A cue without text or number is an input error
#[test]
fn test_parse_srt_string_withMissingTextOrNumber_shouldBeInputError() {
    let no_text = "1\n00:00:00,000 --> 00:00:01,000\n\n2\n00:00:01,000 --> 00:00:02,000\nB\n";
    let no_number = "00:00:00,000 --> 00:00:01,000\nA\n";
    assert!(matches!(CaptionTrack::parse_srt_string(no_text), Err(PipelineError::Input(_))));
    assert!(matches!(CaptionTrack::parse_srt_string(no_number), Err(PipelineError::Input(_))));
}

/// Multi-line cue text is kept
#[test]
fn test_parse_srt_string_withMultilineText_shouldJoinLines() -> Result<()> {
    let content = "1\n00:00:00,000 --> 00:00:02,000\nLine one\nLine two\n";
    let entries = CaptionTrack::parse_srt_string(content)?;
    assert_eq!(entries[0].text, "Line one\nLine two");
    Ok(())
}

/// Content without any cue is an error
#[test]
fn test_parse_srt_string_withNoEntries_shouldFail() {
    assert!(matches!(CaptionTrack::parse_srt_string(""), Err(PipelineError::Input(_))));
    assert!(CaptionTrack::parse_srt_string("just some text\n").is_err());
}

/// A broken cue on disk names the file in the error
#[test]
fn test_read_from_srt_withBrokenCue_shouldNameFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "001_Chapter_1.srt",
        "1\n00:00:00,000 --> 00:00:01,000\nA\n\n2\n00:00:02,000 --> 00:00:01,500\nB\n",
    )?;

    match CaptionTrack::read_from_srt(&path) {
        Err(PipelineError::TimingInconsistency(message)) => assert!(message.contains("001_Chapter_1.srt")),
        other => panic!("expected a timing inconsistency, got {:?}", other),
    }
    Ok(())
}

/// A missing file is a merge I/O error
#[test]
fn test_read_from_srt_withMissingFile_shouldBeMergeIoError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = CaptionTrack::read_from_srt(temp_dir.path().join("gone.srt"));
    assert!(matches!(result, Err(PipelineError::MergeIo(_))));
    Ok(())
}

/// Hours above 99 survive a file round trip
#[test]
fn test_write_and_read_srt_withLongTimestamps_shouldPreserveHours() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("book.srt");
    let start = 101 * 3_600_000;
    let track = CaptionTrack::from_entries(vec![SubtitleEntry::new(1, start, start + 1500, "Late".to_string())]);

    track.write_to_srt(&path)?;
    let loaded = CaptionTrack::read_from_srt(&path)?;

    assert_eq!(loaded, track);
    assert_eq!(loaded.entries[0].format_start_time(), "101:00:00,000");
    assert_eq!(loaded.end_time_ms(), start + 1500);
    Ok(())
}
