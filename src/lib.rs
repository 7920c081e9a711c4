/*!
 * # narrata - Narrated audiobooks with synchronized captions
 *
 * A Rust library that turns plain-text book chapters into narrated audio and
 * SRT captions whose timestamps stay consistent through every merge.
 *
 * ## Features
 *
 * - Sentence-aware chunking of chapter files (2-3 sentences per chunk)
 * - Pluggable text-to-speech engines:
 *   - OpenAI-compatible speech HTTP APIs (e.g. a local Kokoro server)
 *   - Any external command that writes a WAV file
 * - Caption timing derived from measured audio durations
 * - Sample-exact chapter and book merges with shifted captions
 * - Chapter-atomic processing: a failing chapter is skipped, not half-written
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `sentence_streamer`: Text file -> lazy sequence of speakable chunks
 * - `synthesis`: Speech engine trait and its implementations
 * - `segment_synthesizer`: Per-chunk synthesis into WAV assets
 * - `timeline`: Caption tracks from timed assets
 * - `merge`: Offset computation and audio/caption concatenation
 * - `audio`: WAV decoding, encoding and measurement
 * - `subtitle_processor`: Caption model and SRT codec
 * - `manifest`: Per-chapter JSON sidecar
 * - `book_metadata`: Title/Author/Translator and the spoken introduction
 * - `app_controller`: Whole-book orchestration
 * - `app_config`: Configuration management
 * - `file_utils`: File system operations and output layout
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio;
pub mod book_metadata;
pub mod errors;
pub mod file_utils;
pub mod manifest;
pub mod merge;
pub mod segment_synthesizer;
pub mod sentence_streamer;
pub mod subtitle_processor;
pub mod synthesis;
pub mod timeline;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BookReport, ChapterOutput, Controller, SkippedChapter};
pub use audio::{AudioAsset, SynthesizedAudio};
pub use book_metadata::BookMetadata;
pub use errors::{AppError, PipelineError, SynthesisError};
pub use merge::{compute_offsets, merge_audio, merge_captions, MergeSegment};
pub use sentence_streamer::{SentenceStreamer, TextChunk};
pub use subtitle_processor::{CaptionTrack, SubtitleEntry};
pub use synthesis::SpeechSynthesizer;
pub use timeline::TimelineBuilder;
