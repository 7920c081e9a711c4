/*!
 * Error types for the narrata pipeline.
 *
 * Engine-level failures are reported as `SynthesisError`; everything the
 * chunk/timeline/merge pipeline can fail with is a `PipelineError`, whose
 * variants decide how far a failure propagates (chunk, chapter, merge level).
 */

use thiserror::Error;

/// Errors raised by a text-to-speech engine
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// The request to the engine could not be sent or completed
    #[error("Synthesis request failed: {0}")]
    RequestFailed(String),

    /// The engine answered with an error status
    #[error("Engine responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the engine
        message: String,
    },

    /// The external synthesis program failed
    #[error("Synthesis command failed: {0}")]
    CommandFailed(String),

    /// The engine did not answer in time
    #[error("Synthesis timed out after {0} seconds")]
    Timeout(u64),

    /// The engine produced audio we cannot decode
    #[error("Invalid audio returned by engine: {0}")]
    InvalidAudio(String),

    /// The engine produced zero audio frames
    #[error("Engine returned no audio frames")]
    NoAudio,
}

/// Errors produced by the chunking, timing and merge pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed or missing input (chapter file, metadata)
    #[error("Input error: {0}")]
    Input(String),

    /// The engine failed for one chunk; fatal for the enclosing chapter
    #[error("Synthesis failed for {chunk}: {source}")]
    Synthesis {
        /// Name of the chunk that failed (file stem)
        chunk: String,
        /// Underlying engine error
        #[source]
        source: SynthesisError,
    },

    /// A timed asset is missing or has no usable duration
    #[error("Timing inconsistency: {0}")]
    TimingInconsistency(String),

    /// An asset could not be read, written or concatenated
    #[error("Merge I/O error: {0}")]
    MergeIo(String),
}

impl PipelineError {
    /// Short classification used in skip reports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Synthesis { .. } => "synthesis",
            Self::TimingInconsistency(_) => "timing",
            Self::MergeIo(_) => "merge-io",
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the synthesis engine
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Error from the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
