use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Serialize;

use crate::audio::{decode_wav, SynthesizedAudio};
use crate::errors::SynthesisError;
use crate::synthesis::SpeechSynthesizer;

/// Client for OpenAI-compatible speech endpoints
#[derive(Debug)]
pub struct HttpSynthesizer {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. `http://localhost:8880/v1`
    endpoint: String,
    /// Model name sent with every request
    model: String,
    /// Bearer token, empty for local servers
    api_key: String,
    /// Request timeout, reported on expiry
    timeout_secs: u64,
}

/// Speech request body
#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'a str,
}

impl HttpSynthesizer {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout_secs: u64) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SynthesisError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        })
    }

    /// Full URL of the speech route
    pub fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedAudio, SynthesisError> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: "wav",
        };

        let mut builder = self.client.post(self.speech_url()).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SynthesisError::Timeout(self.timeout_secs)
            } else {
                SynthesisError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Speech API error ({}): {}", status, message);
            return Err(SynthesisError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::RequestFailed(format!("Failed to read audio body: {}", e)))?;
        debug!("Received {} bytes of audio", body.len());

        let audio = decode_wav(Cursor::new(body.to_vec()))?;
        if audio.is_empty() {
            return Err(SynthesisError::NoAudio);
        }
        Ok(audio)
    }

    fn name(&self) -> &str {
        "http"
    }
}
