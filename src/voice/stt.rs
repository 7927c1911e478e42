//! Speech-to-text (Groq Whisper)

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Request timeout for transcription
const STT_TIMEOUT: Duration = Duration::from_secs(30);

/// Speech-to-text collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio to text
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Groq-hosted Whisper transcription client (OpenAI-compatible API)
pub struct GroqWhisper {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
}

impl GroqWhisper {
    /// Create a new transcription client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: String, language: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Groq API key required for Whisper".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(STT_TIMEOUT)
                .build()
                .map_err(Error::Http)?,
            api_key,
            model,
            language,
        })
    }
}

#[async_trait]
impl Transcriber for GroqWhisper {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("speech.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post("https://api.groq.com/openai/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        let text = result.text.trim().to_string();

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}
