use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::audio::{read_wav, SynthesizedAudio};
use crate::errors::SynthesisError;
use crate::synthesis::SpeechSynthesizer;

/// Runs a local TTS program: text on stdin, WAV written to `{output}`
#[derive(Debug)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl CommandSynthesizer {
    pub fn new(program: &str, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.to_string(),
            args,
            timeout_secs,
        }
    }

    /// Arguments with `{voice}` and `{output}` substituted
    pub fn render_args(&self, voice: &str, output: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{voice}", voice).replace("{output}", output))
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedAudio, SynthesisError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| SynthesisError::CommandFailed(format!("Failed to create scratch dir: {}", e)))?;
        let output_path = scratch.path().join("speech.wav");
        let args = self.render_args(voice, &output_path.to_string_lossy());

        debug!("Running {} {:?}", self.program, args);
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::CommandFailed(format!("Failed to start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| SynthesisError::CommandFailed(format!("Failed to write text to {}: {}", self.program, e)))?;
            // Dropping stdin signals end of input
        }

        let timeout_duration = Duration::from_secs(self.timeout_secs);
        let result = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| SynthesisError::CommandFailed(e.to_string()))?
            },
            _ = tokio::time::sleep(timeout_duration) => {
                return Err(SynthesisError::Timeout(self.timeout_secs));
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            error!("{} failed: {}", self.program, stderr.trim());
            return Err(SynthesisError::CommandFailed(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        if !output_path.is_file() {
            return Err(SynthesisError::NoAudio);
        }

        let audio = read_wav(&output_path)?;
        if audio.is_empty() {
            return Err(SynthesisError::NoAudio);
        }
        Ok(audio)
    }

    fn name(&self) -> &str {
        &self.program
    }
}
