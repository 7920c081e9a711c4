/*!
 * End-to-end tests for narrating and merging a whole book
 */

use anyhow::Result;
use narrata::audio::wav_duration;
use narrata::file_utils::OutputLayout;
use narrata::subtitle_processor::CaptionTrack;
use narrata::synthesis::mock::MockSynthesizer;
use crate::common;

/// Introduction plus two chapters become one aligned audiobook
#[tokio::test]
async fn test_run_book_withTwoChapters_shouldMergeIntroductionFirst() -> Result<()> {
    common::init_logging();
    let book = common::create_test_book()?;
    let (controller, engine) = common::mock_controller(common::test_config(), MockSynthesizer::fixed(1.0));

    let report = controller.run_book(&book.chapters, &book.metadata, &book.output, false).await?;

    assert_eq!(
        engine.spoken_texts()[0],
        "Welcome, to the audiobook edition of The Mill by Jane Doe. Sit back, relax, and enjoy."
    );
    assert_eq!(engine.call_count(), 5);
    assert_eq!(report.chapters.len(), 2);
    assert!(report.skipped.is_empty());
    assert_eq!(report.duration_seconds, 5.0);

    let layout = OutputLayout::new(&book.output);
    assert_eq!(report.audio.as_deref(), Some(layout.book_audio().as_path()));
    assert_eq!(wav_duration(&layout.book_audio())?, 5.0);

    let track = CaptionTrack::read_from_srt(layout.book_captions())?;
    let intro_cues = report.introduction.as_ref().map_or(0, |i| i.cue_count);
    let chapter_cues: usize = report.chapters.iter().map(|c| c.cue_count).sum();
    assert_eq!(track.len(), intro_cues + chapter_cues);
    assert_eq!(track.entries[intro_cues].start_time_ms, 1000);
    assert_eq!(track.entries[intro_cues + report.chapters[0].cue_count].start_time_ms, 3000);
    assert_eq!(track.end_time_ms(), 5000);
    for (i, entry) in track.entries.iter().enumerate() {
        assert_eq!(entry.seq_num, i + 1);
    }

    assert!(layout.introduction_manifest().exists());
    assert!(layout.chapter_audio("001_Chapter_1").exists());
    assert!(layout.chapter_captions("002_Chapter_2").exists());
    Ok(())
}

/// Clips that are not whole milliseconds still give a gapless book track
#[tokio::test]
async fn test_run_book_withSubMillisecondClips_shouldKeepCuesContiguous() -> Result<()> {
    let book = common::create_test_book()?;
    let (controller, _engine) = common::mock_controller(common::test_config(), MockSynthesizer::fixed(1.0005));

    let report = controller.run_book(&book.chapters, &book.metadata, &book.output, false).await?;

    let track = CaptionTrack::read_from_srt(OutputLayout::new(&book.output).book_captions())?;
    for pair in track.entries.windows(2) {
        assert_eq!(
            pair[0].end_time_ms, pair[1].start_time_ms,
            "gap between cue {} and {}", pair[0].seq_num, pair[1].seq_num
        );
    }
    assert_eq!(track.end_time_ms(), 5002);
    assert!((report.duration_seconds - 5.0025).abs() < 1e-9);
    Ok(())
}

/// A chapter SRT with a broken cue is skipped with a reason, never merged with the cue lost
#[tokio::test]
async fn test_merge_existing_withBrokenChapterCaptions_shouldNotDropCues() -> Result<()> {
    let book = common::create_test_book()?;
    let mut config = common::test_config();
    config.output.chapters_only = true;
    let (controller, _engine) = common::mock_controller(config, MockSynthesizer::fixed(1.0));
    controller.run_book(&book.chapters, &book.metadata, &book.output, false).await?;

    let layout = OutputLayout::new(&book.output);
    std::fs::write(
        layout.chapter_captions("001_Chapter_1"),
        "1\n00:00:00,000 --> 00:00:01,000\nA\n\n2\n00:00:01,000 --> 00:00:01,000\nB\n\n3\n00:00:01,000 --> 00:00:02,000\nC\n",
    )?;

    let report = controller.merge_existing(&book.output)?;

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "001_Chapter_1");
    assert!(report.skipped[0].reason.contains("001_Chapter_1.srt"));
    assert_eq!(report.chapters.len(), 1);
    Ok(())
}

/// A failing chapter is skipped and the book is merged without it
#[tokio::test]
async fn test_run_book_withFailingChapter_shouldSkipIt() -> Result<()> {
    let book = common::create_test_book()?;
    // Call 1 is the introduction, calls 2 and 3 are the first chapter
    let (controller, _engine) =
        common::mock_controller(common::test_config(), MockSynthesizer::fixed(1.0).fail_on_call(3));

    let report = controller.run_book(&book.chapters, &book.metadata, &book.output, false).await?;

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "001_Chapter_1");
    assert_eq!(report.chapters.len(), 1);
    assert_eq!(report.chapters[0].name, "002_Chapter_2");
    assert_eq!(report.duration_seconds, 3.0);

    let layout = OutputLayout::new(&book.output);
    assert!(!layout.chapter_audio("001_Chapter_1").exists());
    assert!(!layout.chapter_work_dir("001_Chapter_1").exists());
    Ok(())
}

/// Without an introduction there is no book
#[tokio::test]
async fn test_run_book_withFailingIntroduction_shouldAbort() -> Result<()> {
    let book = common::create_test_book()?;
    let (controller, engine) =
        common::mock_controller(common::test_config(), MockSynthesizer::fixed(1.0).fail_on_call(1));

    let result = controller.run_book(&book.chapters, &book.metadata, &book.output, false).await;

    assert!(result.is_err());
    assert_eq!(engine.call_count(), 1);
    assert!(!OutputLayout::new(&book.output).book_audio().exists());
    Ok(())
}

/// Metadata without a title cannot be introduced
#[tokio::test]
async fn test_run_book_withBlankTitle_shouldFail() -> Result<()> {
    let book = common::create_test_book()?;
    let metadata = common::create_metadata(book.dir.path(), "  ", "Doe, Jane", "None")?;
    let (controller, engine) = common::mock_controller(common::test_config(), MockSynthesizer::fixed(1.0));

    let result = controller.run_book(&book.chapters, &metadata, &book.output, false).await;

    assert!(result.is_err());
    assert_eq!(engine.call_count(), 0);
    Ok(())
}

/// Chapters-only runs stop before the book merge; merge_existing finishes the job
#[tokio::test]
async fn test_merge_existing_afterChaptersOnly_shouldBuildBookWithoutSynthesis() -> Result<()> {
    let book = common::create_test_book()?;
    let mut config = common::test_config();
    config.output.chapters_only = true;
    let (controller, engine) = common::mock_controller(config, MockSynthesizer::scripted(vec![1.25, 0.5, 2.0]));

    let report = controller.run_book(&book.chapters, &book.metadata, &book.output, false).await?;
    assert!(report.audio.is_none());
    assert!(report.captions.is_none());
    let layout = OutputLayout::new(&book.output);
    assert!(!layout.book_audio().exists());

    let calls = engine.call_count();
    let merged = controller.merge_existing(&book.output)?;

    assert_eq!(engine.call_count(), calls);
    assert_eq!(merged.chapters.len(), 2);
    assert!(merged.chapters.iter().all(|c| c.reused));
    let expected = merged.introduction.as_ref().map_or(0.0, |i| i.duration_seconds)
        + merged.chapters.iter().map(|c| c.duration_seconds).sum::<f64>();
    assert!((merged.duration_seconds - expected).abs() < 1e-6);
    assert!(layout.book_captions().exists());
    Ok(())
}

/// Merging needs at least the introduction on disk
#[test]
fn test_merge_existing_withEmptyOutput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (controller, _engine) = common::mock_controller(common::test_config(), MockSynthesizer::fixed(1.0));

    assert!(controller.merge_existing(temp_dir.path()).is_err());
    Ok(())
}

/// The book SRT survives a parse and render unchanged
#[tokio::test]
async fn test_run_book_bookCaptions_shouldRoundTripExactly() -> Result<()> {
    let book = common::create_test_book()?;
    let (controller, _engine) = common::mock_controller(common::test_config(), MockSynthesizer::per_character(0.015));

    controller.run_book(&book.chapters, &book.metadata, &book.output, false).await?;

    let written = std::fs::read_to_string(OutputLayout::new(&book.output).book_captions())?;
    let reparsed = CaptionTrack::from_entries(CaptionTrack::parse_srt_string(&written)?);
    assert_eq!(reparsed.to_srt_string(), written);
    Ok(())
}

/// Same input and seed give the same book captions in a fresh output dir
#[tokio::test]
async fn test_run_book_twiceIntoSeparateDirs_shouldBeIdentical() -> Result<()> {
    let book = common::create_test_book()?;
    let first_out = book.dir.path().join("first");
    let second_out = book.dir.path().join("second");

    let (first, _) = common::mock_controller(common::test_config(), MockSynthesizer::per_character(0.015));
    first.run_book(&book.chapters, &book.metadata, &first_out, false).await?;
    let (second, _) = common::mock_controller(common::test_config(), MockSynthesizer::per_character(0.015));
    second.run_book(&book.chapters, &book.metadata, &second_out, false).await?;

    assert_eq!(
        std::fs::read_to_string(OutputLayout::new(&first_out).book_captions())?,
        std::fs::read_to_string(OutputLayout::new(&second_out).book_captions())?
    );
    Ok(())
}
