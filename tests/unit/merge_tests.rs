/*!
 * Tests for offsets and the merge engine
 */

use anyhow::Result;
use narrata::audio::wav_duration;
use narrata::merge::{boundaries_ms, compute_offsets, merge_audio, merge_caption_files, merge_captions, merge_segments, MergeSegment};
use narrata::subtitle_processor::{CaptionTrack, SubtitleEntry};
use narrata::timeline::TimelineBuilder;
use narrata::audio::AudioAsset;
use narrata::PipelineError;
use crate::common;

fn single_cue(end_ms: u64, text: &str) -> CaptionTrack {
    CaptionTrack::from_entries(vec![SubtitleEntry::new(1, 0, end_ms, text.to_string())])
}

/// Offsets are exclusive prefix sums
#[test]
fn test_compute_offsets_withDurations_shouldReturnPrefixSums() {
    assert_eq!(compute_offsets(&[1.0, 2.0, 3.0, 4.0]), vec![0.0, 1.0, 3.0, 6.0]);
    assert_eq!(compute_offsets(&[5.5]), vec![0.0]);
}

/// Merged duration equals the sum of inputs within one sample period
#[test]
fn test_merge_audio_withThreeFiles_shouldSumDurations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let inputs = vec![
        common::create_test_wav(&dir.join("a.wav"), 1.5, 22_050)?,
        common::create_test_wav(&dir.join("b.wav"), 0.333, 22_050)?,
        common::create_test_wav(&dir.join("c.wav"), 2.0, 22_050)?,
    ];
    let expected: f64 = inputs.iter().map(|p| wav_duration(p)).collect::<Result<Vec<_>, _>>()?.iter().sum();

    let merged = merge_audio(&inputs, &dir.join("out").join("merged.wav"))?;

    assert!((merged.duration_seconds - expected).abs() <= 1.0 / 22_050.0);
    assert!((wav_duration(&merged.path)? - expected).abs() <= 1.0 / 22_050.0);
    Ok(())
}

/// Inputs with different sample rates cannot be concatenated
#[test]
fn test_merge_audio_withMismatchedRates_shouldBeMergeIoError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let inputs = vec![
        common::create_test_wav(&dir.join("a.wav"), 1.0, 24_000)?,
        common::create_test_wav(&dir.join("b.wav"), 1.0, 16_000)?,
    ];

    let result = merge_audio(&inputs, &dir.join("merged.wav"));
    assert!(matches!(result, Err(PipelineError::MergeIo(_))));
    Ok(())
}

/// Nothing to merge is an error
#[test]
fn test_merge_audio_withNoInputs_shouldBeMergeIoError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = merge_audio(&[], &temp_dir.path().join("merged.wav"));
    assert!(matches!(result, Err(PipelineError::MergeIo(_))));
    Ok(())
}

/// The second chunk's first cue starts at the first chunk's duration
#[test]
fn test_merge_captions_withTwoAndThreeSeconds_shouldStartSecondAtTwo() -> Result<()> {
    let merged = merge_captions(&[single_cue(2000, "A"), single_cue(3000, "B")], &[2.0, 3.0])?;

    assert_eq!(merged.entries[1].format_start_time(), "00:00:02,000");
    assert_eq!(merged.entries[1].format_end_time(), "00:00:05,000");
    Ok(())
}

/// Boundaries are truncated running sums, not sums of truncated durations
#[test]
fn test_boundaries_ms_withSubMillisecondDurations_shouldTruncateRunningSum() {
    assert_eq!(boundaries_ms(&[1.0005, 1.0005, 1.0005]), vec![0, 1000, 2001, 3001]);
    assert_eq!(boundaries_ms(&[]), vec![0]);
}

/// Tracks with sub-millisecond durations still join without gaps
#[test]
fn test_merge_captions_withSubMillisecondDurations_shouldStayContiguous() -> Result<()> {
    let builder = TimelineBuilder::default();
    let durations = [1.0005, 1.0005, 1.0005];
    let tracks = durations
        .iter()
        .map(|d| builder.build(&[AudioAsset::new("x.wav".into(), *d, "One line.".to_string())], 0.0))
        .collect::<Result<Vec<_>, _>>()?;

    let merged = merge_captions(&tracks, &durations)?;

    for pair in merged.entries.windows(2) {
        assert_eq!(
            pair[0].end_time_ms, pair[1].start_time_ms,
            "gap between cue {} and {}", pair[0].seq_num, pair[1].seq_num
        );
    }
    assert_eq!(merged.end_time_ms(), 3001);
    Ok(())
}

/// A cue ending well before its track's duration is not stretched
#[test]
fn test_merge_captions_withTrailingSilence_shouldKeepCueEnd() -> Result<()> {
    let merged = merge_captions(&[single_cue(1500, "Short."), single_cue(1000, "Next.")], &[2.0, 1.0])?;

    assert_eq!(merged.entries[0].end_time_ms, 1500);
    assert_eq!(merged.entries[1].start_time_ms, 2000);
    Ok(())
}

/// Merging per-chunk timelines equals building the whole chapter at once
#[test]
fn test_merge_captions_withChunkTracks_shouldMatchChapterTimeline() -> Result<()> {
    let builder = TimelineBuilder::new(12);
    let assets = vec![
        AudioAsset::new("0.wav".into(), 1.7, "alpha beta gamma delta".to_string()),
        AudioAsset::new("1.wav".into(), 2.3, "epsilon zeta".to_string()),
        AudioAsset::new("2.wav".into(), 0.9, "eta theta iota kappa lambda".to_string()),
    ];

    let whole = builder.build(&assets, 0.0)?;
    let parts = assets
        .iter()
        .map(|a| builder.build(std::slice::from_ref(a), 0.0))
        .collect::<Result<Vec<_>, _>>()?;
    let merged = merge_captions(&parts, &[1.7, 2.3, 0.9])?;

    assert_eq!(merged.len(), whole.len());
    for (m, w) in merged.entries.iter().zip(&whole.entries) {
        assert_eq!(m.seq_num, w.seq_num);
        assert_eq!(m.text, w.text);
        assert!(m.start_time_ms.abs_diff(w.start_time_ms) <= 1);
        assert!(m.end_time_ms.abs_diff(w.end_time_ms) <= 1);
    }
    Ok(())
}

/// SRT files on disk merge like in-memory tracks
#[test]
fn test_merge_caption_files_withTwoFiles_shouldRenumber() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let first = dir.join("intro.srt");
    let second = dir.join("chapter.srt");
    single_cue(1500, "Welcome.").write_to_srt(&first)?;
    CaptionTrack::from_entries(vec![
        SubtitleEntry::new(1, 0, 1000, "One.".to_string()),
        SubtitleEntry::new(2, 1000, 2000, "Two.".to_string()),
    ])
    .write_to_srt(&second)?;

    let merged = merge_caption_files(&[first, second], &[1.5, 2.0])?;

    let numbers: Vec<usize> = merged.entries.iter().map(|e| e.seq_num).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(merged.entries[2].start_time_ms, 2500);
    assert_eq!(merged.end_time_ms(), 3500);
    Ok(())
}

/// Segments are merged in lockstep and stay aligned
#[test]
fn test_merge_segments_withIntroAndChapters_shouldAlignCaptionsWithAudio() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();

    let segments = [(1.25, "Intro."), (2.5, "Chapter one."), (3.75, "Chapter two.")]
        .iter()
        .enumerate()
        .map(|(i, (secs, text))| -> Result<MergeSegment> {
            let audio = common::create_test_wav(&dir.join(format!("{}.wav", i)), *secs, 24_000)?;
            Ok(MergeSegment {
                duration_seconds: wav_duration(&audio)?,
                audio,
                captions: single_cue((*secs * 1000.0) as u64, text),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (audio, captions) = merge_segments(&segments, &dir.join("book.wav"))?;

    assert_eq!(captions.len(), 3);
    assert_eq!(captions.entries[1].start_time_ms, 1250);
    assert_eq!(captions.entries[2].start_time_ms, 3750);
    assert!((captions.end_time_ms() as f64 / 1000.0 - audio.duration_seconds).abs() < 0.002);
    Ok(())
}

/// A segment without duration is rejected before anything is written
#[test]
fn test_merge_segments_withZeroDuration_shouldBeTimingInconsistency() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("book.wav");
    let segment = MergeSegment {
        audio: temp_dir.path().join("missing.wav"),
        duration_seconds: 0.0,
        captions: CaptionTrack::new(),
    };

    let result = merge_segments(&[segment], &output);
    assert!(matches!(result, Err(PipelineError::TimingInconsistency(_))));
    assert!(!output.exists());
    Ok(())
}
