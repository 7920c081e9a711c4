/*!
 * Streaming sentence chunker.
 *
 * Reads a chapter line by line and yields chunks of two or three sentences,
 * carrying incomplete sentences across line breaks so a sentence wrapped over
 * several lines is never cut.
 */

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use crate::errors::PipelineError;

// Terminal punctuation followed by whitespace; the punctuation stays with its sentence
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

// Buffer ends on a complete sentence, optionally closed by a quote
static COMPLETE_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[.!?]["']?\s*$"#).unwrap());

/// Smallest chunk emitted before the end of the file
pub const MIN_CHUNK_SENTENCES: usize = 2;

/// Largest chunk ever emitted
pub const MAX_CHUNK_SENTENCES: usize = 3;

/// One synthesis unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of the chunk within its chapter, starting at 0
    pub sequence_index: usize,
    /// Sentences joined by single spaces
    pub text: String,
}

impl TextChunk {
    /// Fixed-width stem so file names sort in playback order
    pub fn file_stem(&self) -> String {
        format!("{:06}", self.sequence_index)
    }
}

/// Chooses how many sentences go into the next chunk
pub trait ChunkSizer {
    /// Requested chunk size; values are clamped to 2..=3
    fn next_size(&mut self) -> usize;
}

/// Draws 2 or 3 from a seeded generator
#[derive(Debug, Clone)]
pub struct RandomChunkSizer {
    rng: StdRng,
}

impl RandomChunkSizer {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl ChunkSizer for RandomChunkSizer {
    fn next_size(&mut self) -> usize {
        self.rng.random_range(MIN_CHUNK_SENTENCES..=MAX_CHUNK_SENTENCES)
    }
}

/// Always requests the same size
#[derive(Debug, Clone, Copy)]
pub struct FixedChunkSizer(pub usize);

impl ChunkSizer for FixedChunkSizer {
    fn next_size(&mut self) -> usize {
        self.0
    }
}

/// Replays a list of sizes, repeating the last one
#[derive(Debug, Clone)]
pub struct SequenceChunkSizer {
    sizes: Vec<usize>,
    position: usize,
}

impl SequenceChunkSizer {
    pub fn new(sizes: Vec<usize>) -> Self {
        Self { sizes, position: 0 }
    }
}

impl ChunkSizer for SequenceChunkSizer {
    fn next_size(&mut self) -> usize {
        let size = self
            .sizes
            .get(self.position)
            .or_else(|| self.sizes.last())
            .copied()
            .unwrap_or(MIN_CHUNK_SENTENCES);
        self.position += 1;
        size
    }
}

/// Line-carry state machine: an incomplete trailing fragment plus completed sentences.
///
/// A chunk is only released while at least two sentences would remain behind
/// it, so the end of the file can never strand a single sentence unless the
/// whole file holds just one.
#[derive(Debug, Default)]
pub struct SentenceBuffer {
    carry: String,
    pending: VecDeque<String>,
    next_size: Option<usize>,
}

impl SentenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one source line and move every completed sentence into `pending`
    pub fn push_line(&mut self, line: &str) {
        self.carry.push(' ');
        self.carry.push_str(line.trim());

        let mut fragments: Vec<String> = Vec::new();
        let mut last = 0;
        for m in SENTENCE_BREAK.find_iter(&self.carry) {
            // Punctuation is a single ASCII byte
            fragments.push(self.carry[last..m.start() + 1].to_string());
            last = m.end();
        }
        let tail = self.carry[last..].to_string();

        if COMPLETE_TAIL.is_match(&self.carry) {
            fragments.push(tail);
            self.carry.clear();
        } else {
            self.carry = tail;
        }

        self.pending.extend(
            fragments
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        );
    }

    /// Number of completed sentences waiting to be chunked
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take one chunk if enough sentences are pending behind it.
    ///
    /// At least two sentences stay behind every chunk taken here, so the
    /// end of the file can never strand a single sentence: `[A..E]` with a
    /// first draw of 2 splits as `AB|CDE`, never `AB|CD|E`. The first chunk
    /// is therefore only emitted once `size + 2` sentences have been read.
    pub fn take_chunk(&mut self, sizer: &mut dyn ChunkSizer) -> Option<String> {
        if self.pending.len() < MIN_CHUNK_SENTENCES {
            return None;
        }
        // The draw is held until used so each chunk consumes exactly one draw
        let size = *self.next_size.get_or_insert_with(|| draw_size(sizer));
        if self.pending.len() < size + MIN_CHUNK_SENTENCES {
            return None;
        }
        self.next_size = None;
        Some(self.drain_chunk(size))
    }

    /// End of input: the carry becomes the last sentence
    pub fn close(&mut self) {
        let carry = std::mem::take(&mut self.carry);
        let carry = carry.trim();
        if !carry.is_empty() {
            self.pending.push_back(carry.to_string());
        }
    }

    /// After `close`, drain the remaining sentences in chunks of 2 or 3
    pub fn take_final_chunk(&mut self, sizer: &mut dyn ChunkSizer) -> Option<String> {
        let remaining = self.pending.len();
        if remaining == 0 {
            return None;
        }
        if remaining <= MAX_CHUNK_SENTENCES {
            self.next_size = None;
            return Some(self.drain_chunk(remaining));
        }
        let mut size = self.next_size.take().unwrap_or_else(|| draw_size(sizer));
        if remaining - size < MIN_CHUNK_SENTENCES {
            size = MIN_CHUNK_SENTENCES;
        }
        Some(self.drain_chunk(size))
    }

    fn drain_chunk(&mut self, size: usize) -> String {
        let sentences: Vec<String> = self.pending.drain(..size).collect();
        sentences.join(" ")
    }
}

fn draw_size(sizer: &mut dyn ChunkSizer) -> usize {
    sizer.next_size().clamp(MIN_CHUNK_SENTENCES, MAX_CHUNK_SENTENCES)
}

/// Lazy chunk sequence over a line source
pub struct ChunkStream<R: BufRead, S: ChunkSizer> {
    lines: Lines<R>,
    buffer: SentenceBuffer,
    sizer: S,
    next_index: usize,
    at_eof: bool,
    failed: bool,
}

impl<R: BufRead, S: ChunkSizer> ChunkStream<R, S> {
    pub fn new(reader: R, sizer: S) -> Self {
        Self {
            lines: reader.lines(),
            buffer: SentenceBuffer::new(),
            sizer,
            next_index: 0,
            at_eof: false,
            failed: false,
        }
    }

    fn emit(&mut self, text: String) -> TextChunk {
        let chunk = TextChunk { sequence_index: self.next_index, text };
        self.next_index += 1;
        chunk
    }
}

impl<R: BufRead, S: ChunkSizer> Iterator for ChunkStream<R, S> {
    type Item = Result<TextChunk, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.at_eof {
            return self.buffer.take_final_chunk(&mut self.sizer).map(|text| Ok(self.emit(text)));
        }

        loop {
            if let Some(text) = self.buffer.take_chunk(&mut self.sizer) {
                return Some(Ok(self.emit(text)));
            }

            match self.lines.next() {
                Some(Ok(line)) => self.buffer.push_line(&line),
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(PipelineError::Input(format!("Failed to read chapter text: {}", e))));
                }
                None => {
                    self.at_eof = true;
                    self.buffer.close();
                    return self.buffer.take_final_chunk(&mut self.sizer).map(|text| Ok(self.emit(text)));
                }
            }
        }
    }
}

/// Opens chapter files as fresh chunk streams
#[derive(Debug, Clone)]
pub struct SentenceStreamer {
    seed: u64,
}

impl SentenceStreamer {
    /// Streamer whose random size draw restarts from `seed` on every call
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Stream a chapter file with the seeded 2-or-3 draw
    pub fn stream<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<ChunkStream<BufReader<File>, RandomChunkSizer>, PipelineError> {
        self.stream_with_sizer(path, RandomChunkSizer::from_seed(self.seed))
    }

    /// Stream a chapter file with a caller-provided sizer
    pub fn stream_with_sizer<P: AsRef<Path>, S: ChunkSizer>(
        &self,
        path: P,
        sizer: S,
    ) -> Result<ChunkStream<BufReader<File>, S>, PipelineError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| PipelineError::Input(format!("Cannot open chapter file {}: {}", path.display(), e)))?;
        debug!("Streaming sentences from {}", path.display());
        Ok(ChunkStream::new(BufReader::new(file), sizer))
    }
}

/// Chunk an in-memory text; convenient for short strings and tests
pub fn chunk_text<S: ChunkSizer>(text: &str, sizer: S) -> Result<Vec<TextChunk>, PipelineError> {
    ChunkStream::new(text.as_bytes(), sizer).collect()
}
