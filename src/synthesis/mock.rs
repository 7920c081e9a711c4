/*!
 * Mock speech engine for testing.
 *
 * Produces silent-ish audio of a scripted length so timing can be asserted
 * exactly, and can simulate the failure modes the pipeline must handle:
 * - `MockSynthesizer::fixed(secs)` - every call lasts `secs`
 * - `MockSynthesizer::scripted(vec)` - call N lasts `vec[N % len]`
 * - `MockSynthesizer::failing()` - always errors
 * - `MockSynthesizer::empty()` - returns zero frames
 * - `.fail_on_call(n)` - the n-th call (1-based) errors
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::SynthesizedAudio;
use crate::errors::SynthesisError;
use crate::synthesis::SpeechSynthesizer;

/// Native rate of the engines this mock stands in for
pub const MOCK_SAMPLE_RATE: u32 = 24_000;

/// How long each synthesized clip lasts
#[derive(Debug, Clone, PartialEq)]
pub enum MockDuration {
    /// Every clip has the same length
    Fixed(f64),
    /// Length proportional to the text length
    PerCharacter(f64),
    /// Lengths by call order, cycling
    Scripted(Vec<f64>),
}

/// Behavior mode for the mock engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails on the given call number (1-based)
    FailOnCall { call: usize },
    /// Always fails with an error
    Failing,
    /// Succeeds but returns no frames
    Empty,
}

/// Deterministic stand-in for a speech engine
#[derive(Debug)]
pub struct MockSynthesizer {
    duration: MockDuration,
    behavior: MockBehavior,
    call_count: Arc<AtomicUsize>,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl MockSynthesizer {
    pub fn new(duration: MockDuration, behavior: MockBehavior) -> Self {
        Self {
            duration,
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every clip lasts `seconds`
    pub fn fixed(seconds: f64) -> Self {
        Self::new(MockDuration::Fixed(seconds), MockBehavior::Working)
    }

    /// Clip lengths follow `durations` in call order
    pub fn scripted(durations: Vec<f64>) -> Self {
        Self::new(MockDuration::Scripted(durations), MockBehavior::Working)
    }

    /// Clip length is `seconds_per_char` times the text length
    pub fn per_character(seconds_per_char: f64) -> Self {
        Self::new(MockDuration::PerCharacter(seconds_per_char), MockBehavior::Working)
    }

    /// Always errors
    pub fn failing() -> Self {
        Self::new(MockDuration::Fixed(1.0), MockBehavior::Failing)
    }

    /// Always returns zero frames
    pub fn empty() -> Self {
        Self::new(MockDuration::Fixed(1.0), MockBehavior::Empty)
    }

    /// Make the n-th call (1-based) fail
    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.behavior = MockBehavior::FailOnCall { call };
        self
    }

    /// Number of synthesize calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts passed to synthesize, in call order
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn clip_seconds(&self, index: usize, text: &str) -> f64 {
        match &self.duration {
            MockDuration::Fixed(secs) => *secs,
            MockDuration::PerCharacter(per_char) => per_char * text.chars().count() as f64,
            MockDuration::Scripted(list) if list.is_empty() => 0.0,
            MockDuration::Scripted(list) => list[index % list.len()],
        }
    }
}

impl Clone for MockSynthesizer {
    fn clone(&self) -> Self {
        Self {
            duration: self.duration.clone(),
            behavior: self.behavior,
            call_count: Arc::clone(&self.call_count),
            spoken: Arc::clone(&self.spoken),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<SynthesizedAudio, SynthesisError> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }

        match self.behavior {
            MockBehavior::Failing => {
                return Err(SynthesisError::ApiError {
                    status_code: 500,
                    message: "Simulated engine failure".to_string(),
                });
            }
            MockBehavior::FailOnCall { call } if index + 1 == call => {
                return Err(SynthesisError::ApiError {
                    status_code: 503,
                    message: format!("Simulated failure on call #{}", call),
                });
            }
            MockBehavior::Empty => return Ok(SynthesizedAudio::new(Vec::new(), MOCK_SAMPLE_RATE)),
            _ => {}
        }

        let frames = (self.clip_seconds(index, text) * MOCK_SAMPLE_RATE as f64).round() as usize;
        Ok(SynthesizedAudio::new(vec![0.1; frames], MOCK_SAMPLE_RATE))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
