use anyhow::{Result, Context};
use log::{error, warn, info, debug};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::app_config::Config;
use crate::audio::{wav_duration, AudioAsset};
use crate::book_metadata::BookMetadata;
use crate::errors::PipelineError;
use crate::file_utils::{FileManager, OutputLayout};
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::merge::{merge_audio, merge_segments, MergeSegment};
use crate::segment_synthesizer::{SegmentSynthesizer, INTRODUCTION_STEM};
use crate::sentence_streamer::SentenceStreamer;
use crate::subtitle_processor::CaptionTrack;
use crate::synthesis::{create_synthesizer, SpeechSynthesizer};
use crate::timeline::TimelineBuilder;

// @module: Application controller for book narration

/// Largest gap tolerated between a caption track's end and its audio's end
const MAX_TRACK_DRIFT_SECONDS: f64 = 0.005;

/// A finished chapter-level (or introduction) audio/caption pair
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutput {
    /// Chapter name (file stem of the source text)
    pub name: String,
    /// Merged chapter audio
    pub audio: PathBuf,
    /// Chapter captions
    pub captions: PathBuf,
    /// Measured audio duration
    pub duration_seconds: f64,
    /// Number of caption cues
    pub cue_count: usize,
    /// True when existing outputs were reused without synthesis
    pub reused: bool,
}

/// A chapter that could not be narrated
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedChapter {
    pub name: String,
    pub reason: String,
}

/// Outcome of a whole-book run
#[derive(Debug, Clone, Default)]
pub struct BookReport {
    /// Introduction output, when one was produced or found
    pub introduction: Option<ChapterOutput>,
    /// Chapters that made it into the book, in playback order
    pub chapters: Vec<ChapterOutput>,
    /// Chapters excluded from the book and why
    pub skipped: Vec<SkippedChapter>,
    /// Book audio, absent in chapters-only mode
    pub audio: Option<PathBuf>,
    /// Book captions, absent in chapters-only mode
    pub captions: Option<PathBuf>,
    /// Total book duration (0 when no book was merged)
    pub duration_seconds: f64,
}

/// Main application controller for audiobook narration
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Speech engine shared by every chunk
    synthesizer: Box<dyn SpeechSynthesizer>,
}

impl Controller {
    // @method: Create a new controller with the engine described by the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let synthesizer = create_synthesizer(&config.synthesis)
            .context("Failed to create speech synthesizer")?;
        Ok(Self::with_synthesizer(config, synthesizer))
    }

    /// Create a controller around an already constructed engine
    pub fn with_synthesizer(config: Config, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        Self { config, synthesizer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn timeline_builder(&self) -> TimelineBuilder {
        TimelineBuilder::new(self.config.subtitles.max_line_width)
    }

    /// Narrate every chapter of a book and merge the result.
    ///
    /// A failing chapter is skipped and reported; a failing introduction or
    /// book merge aborts the run.
    pub async fn run_book(
        &self,
        chapters_dir: &Path,
        metadata_path: &Path,
        output_dir: &Path,
        force_overwrite: bool,
    ) -> Result<BookReport> {
        let start_time = std::time::Instant::now();

        let metadata = BookMetadata::load(metadata_path)?;
        let chapter_files = FileManager::find_chapter_files(chapters_dir)?;
        if chapter_files.is_empty() {
            warn!("No chapter text files found in {:?}", chapters_dir);
        }

        let layout = OutputLayout::new(output_dir);
        FileManager::ensure_dir(layout.audio_dir())?;

        info!("Narrating \"{}\" by {} ({} chapters)", metadata.title, metadata.author, chapter_files.len());

        let introduction = self
            .narrate_introduction(&metadata, &layout, force_overwrite)
            .await
            .context("Failed to narrate the introduction")?;

        let mut report = BookReport {
            introduction: Some(introduction),
            ..BookReport::default()
        };

        for chapter_file in &chapter_files {
            let name = FileManager::chapter_name(chapter_file);
            match self.narrate_chapter(chapter_file, &layout, force_overwrite).await {
                Ok(output) => report.chapters.push(output),
                Err(e) => {
                    error!("Skipping chapter {}: {}", name, e);
                    report.skipped.push(SkippedChapter { name, reason: e.to_string() });
                }
            }
        }

        if self.config.output.chapters_only {
            info!(
                "Chapters-only mode: {} chapters narrated, {} skipped in {}",
                report.chapters.len(),
                report.skipped.len(),
                Self::format_duration(start_time.elapsed())
            );
            return Ok(report);
        }

        self.merge_book(&layout, &mut report)
            .context("Failed to merge the audiobook")?;

        info!(
            "Audiobook completed in {}: {} chapters, {} skipped, {:.1}s of audio",
            Self::format_duration(start_time.elapsed()),
            report.chapters.len(),
            report.skipped.len(),
            report.duration_seconds
        );

        Ok(report)
    }

    /// Build the book from outputs already on disk, without synthesizing
    pub fn merge_existing(&self, output_dir: &Path) -> Result<BookReport> {
        let layout = OutputLayout::new(output_dir);
        let mut report = BookReport::default();

        let intro_audio = layout.introduction_audio();
        let intro_captions = layout.introduction_captions();
        if !FileManager::file_exists(&intro_audio) || !FileManager::file_exists(&intro_captions) {
            return Err(PipelineError::Input(format!(
                "No introduction outputs in {:?}",
                layout.audio_dir()
            ))
            .into());
        }
        report.introduction = Some(Self::existing_output(INTRODUCTION_STEM, intro_audio, intro_captions)?);

        for name in Self::existing_chapter_names(&layout)? {
            if !layout.chapter_outputs_exist(&name) {
                warn!("Chapter {} has audio but no captions, leaving it out", name);
                report.skipped.push(SkippedChapter {
                    name: name.clone(),
                    reason: format!("Missing {:?}", layout.chapter_captions(&name)),
                });
                continue;
            }
            match Self::existing_output(&name, layout.chapter_audio(&name), layout.chapter_captions(&name)) {
                Ok(output) => report.chapters.push(output),
                Err(e) => {
                    error!("Skipping chapter {}: {}", name, e);
                    report.skipped.push(SkippedChapter { name, reason: e.to_string() });
                }
            }
        }

        self.merge_book(&layout, &mut report)
            .context("Failed to merge the audiobook")?;
        info!("Merged {} chapters into {:?}", report.chapters.len(), layout.book_audio());
        Ok(report)
    }

    /// Synthesize the greeting and write its audio, manifest and captions
    pub async fn narrate_introduction(
        &self,
        metadata: &BookMetadata,
        layout: &OutputLayout,
        force_overwrite: bool,
    ) -> Result<ChapterOutput, PipelineError> {
        let audio_path = layout.introduction_audio();
        let captions_path = layout.introduction_captions();

        if !force_overwrite && FileManager::file_exists(&audio_path) && FileManager::file_exists(&captions_path) {
            warn!("Reusing existing introduction (use -f to force overwrite)");
            return Self::existing_output(INTRODUCTION_STEM, audio_path, captions_path);
        }

        let segments = SegmentSynthesizer::new(self.synthesizer.as_ref());
        let asset = segments
            .synthesize_introduction(metadata, &self.config.voice, &layout.audio_dir())
            .await?;

        Manifest::from_assets(std::slice::from_ref(&asset)).save(&layout.introduction_manifest())?;

        let track = self.timeline_builder().build(std::slice::from_ref(&asset), 0.0)?;
        Self::write_captions(&track, &captions_path)?;

        info!("Introduction narrated ({:.1}s)", asset.duration_seconds);
        Ok(ChapterOutput {
            name: INTRODUCTION_STEM.to_string(),
            audio: asset.path,
            captions: captions_path,
            duration_seconds: asset.duration_seconds,
            cue_count: track.len(),
            reused: false,
        })
    }

    /// Narrate one chapter file into `<chapter>.wav` and `<chapter>.srt`.
    ///
    /// All or nothing: on failure the work dir and partial outputs are removed.
    pub async fn narrate_chapter(
        &self,
        chapter_file: &Path,
        layout: &OutputLayout,
        force_overwrite: bool,
    ) -> Result<ChapterOutput, PipelineError> {
        let name = FileManager::chapter_name(chapter_file);

        if !force_overwrite && layout.chapter_outputs_exist(&name) {
            warn!("Reusing existing chapter {} (use -f to force overwrite)", name);
            return Self::existing_output(&name, layout.chapter_audio(&name), layout.chapter_captions(&name));
        }

        info!("Narrating chapter {}", name);
        let result = self.build_chapter(&name, chapter_file, layout).await;

        let work_dir = layout.chapter_work_dir(&name);
        match result {
            Ok(output) => {
                if !self.config.output.keep_intermediates {
                    Self::log_cleanup(FileManager::remove_dir(&work_dir));
                }
                info!("Chapter {} done: {} cues, {:.1}s", name, output.cue_count, output.duration_seconds);
                Ok(output)
            }
            Err(e) => {
                Self::log_cleanup(FileManager::remove_dir(&work_dir));
                Self::log_cleanup(FileManager::remove_file(&layout.chapter_audio(&name)));
                Self::log_cleanup(FileManager::remove_file(&layout.chapter_captions(&name)));
                Err(e)
            }
        }
    }

    async fn build_chapter(
        &self,
        name: &str,
        chapter_file: &Path,
        layout: &OutputLayout,
    ) -> Result<ChapterOutput, PipelineError> {
        let work_dir = layout.chapter_work_dir(name);
        // Stale chunks from an interrupted run would shift every offset
        FileManager::remove_dir(&work_dir).map_err(|e| PipelineError::MergeIo(format!("{:#}", e)))?;
        FileManager::ensure_dir(&work_dir).map_err(|e| PipelineError::MergeIo(format!("{:#}", e)))?;

        let streamer = SentenceStreamer::new(self.config.chunking.seed);
        let segments = SegmentSynthesizer::new(self.synthesizer.as_ref());
        let mut assets: Vec<AudioAsset> = Vec::new();

        for chunk in streamer.stream(chapter_file)? {
            let chunk = chunk?;
            let asset = segments.synthesize_chunk(&chunk, &self.config.voice, &work_dir).await?;
            debug!("Chunk {} of {}: {:.3}s", chunk.sequence_index, name, asset.duration_seconds);
            assets.push(asset);
        }

        if assets.is_empty() {
            return Err(PipelineError::Input(format!("Chapter {} has no speakable text", name)));
        }

        let manifest_path = work_dir.join(MANIFEST_FILE_NAME);
        Manifest::from_assets(&assets).save(&manifest_path)?;

        let track = self.timeline_builder().build_from_manifest(&manifest_path, &work_dir)?;
        let paths: Vec<PathBuf> = assets.iter().map(|a| a.path.clone()).collect();
        let merged = merge_audio(&paths, &layout.chapter_audio(name))?;
        Self::check_drift(name, &track, merged.duration_seconds)?;

        let captions_path = layout.chapter_captions(name);
        Self::write_captions(&track, &captions_path)?;

        Ok(ChapterOutput {
            name: name.to_string(),
            audio: merged.path,
            captions: captions_path,
            duration_seconds: merged.duration_seconds,
            cue_count: track.len(),
            reused: false,
        })
    }

    /// Merge the introduction and the report's chapters into the book outputs
    fn merge_book(&self, layout: &OutputLayout, report: &mut BookReport) -> Result<(), PipelineError> {
        let introduction = report
            .introduction
            .as_ref()
            .ok_or_else(|| PipelineError::Input("The book has no introduction".to_string()))?;

        let segments = std::iter::once(introduction)
            .chain(report.chapters.iter())
            .map(|output| {
                let captions = CaptionTrack::read_from_srt(&output.captions)?;
                Ok(MergeSegment {
                    audio: output.audio.clone(),
                    duration_seconds: wav_duration(&output.audio)?,
                    captions,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        let book_audio = layout.book_audio();
        let book_captions = layout.book_captions();

        let merged = merge_segments(&segments, &book_audio).and_then(|(audio, track)| {
            Self::check_drift("audiobook", &track, audio.duration_seconds)?;
            Self::write_captions(&track, &book_captions)?;
            Ok(audio)
        });

        match merged {
            Ok(audio) => {
                report.audio = Some(audio.path);
                report.captions = Some(book_captions);
                report.duration_seconds = audio.duration_seconds;
                Ok(())
            }
            Err(e) => {
                Self::log_cleanup(FileManager::remove_file(&book_audio));
                Self::log_cleanup(FileManager::remove_file(&book_captions));
                Err(e)
            }
        }
    }

    /// Describe chapter outputs that are already on disk
    fn existing_output(name: &str, audio: PathBuf, captions: PathBuf) -> Result<ChapterOutput, PipelineError> {
        let duration_seconds = wav_duration(&audio)?;
        let track = CaptionTrack::read_from_srt(&captions)?;
        Ok(ChapterOutput {
            name: name.to_string(),
            audio,
            captions,
            duration_seconds,
            cue_count: track.len(),
            reused: true,
        })
    }

    /// Chapter names with a merged WAV in the audio dir, in lexicographic order
    fn existing_chapter_names(layout: &OutputLayout) -> Result<Vec<String>> {
        let audio_dir = layout.audio_dir();
        let mut names = Vec::new();
        for entry in WalkDir::new(&audio_dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let is_wav = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("wav"));
            if !path.is_file() || !is_wav {
                continue;
            }
            let name = FileManager::chapter_name(path);
            if name != INTRODUCTION_STEM {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn write_captions(track: &CaptionTrack, path: &Path) -> Result<(), PipelineError> {
        track
            .write_to_srt(path)
            .map_err(|e| PipelineError::MergeIo(format!("{:#}", e)))
    }

    /// The caption track must end where its audio ends
    fn check_drift(name: &str, track: &CaptionTrack, audio_seconds: f64) -> Result<(), PipelineError> {
        let track_seconds = track.end_time_ms() as f64 / 1000.0;
        if (track_seconds - audio_seconds).abs() > MAX_TRACK_DRIFT_SECONDS {
            return Err(PipelineError::TimingInconsistency(format!(
                "{}: captions end at {:.3}s but audio lasts {:.3}s",
                name, track_seconds, audio_seconds
            )));
        }
        Ok(())
    }

    /// Cleanup failures are logged; they never replace the original outcome
    fn log_cleanup(result: Result<()>) {
        if let Err(e) = result {
            warn!("Cleanup failed: {:#}", e);
        }
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
