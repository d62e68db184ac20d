use async_trait::async_trait;
use reqwest::Client;
use runbook_core::{Result, RunbookError};
use tracing::{debug, info};

/// Largest audio payload accepted for transcription.
pub const MAX_AUDIO_BYTES: usize = 2 * 1024 * 1024;

/// Speech-to-text backend used for audio input.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribe `audio`. `file_name` carries the extension the backend
    /// uses to detect the container format.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String>;
}

/// OpenAI audio transcription API (`whisper-1`).
pub struct OpenAiTranscriber {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".into(),
            model: "whisper-1".into(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

/// Reject payloads the transcription endpoint would refuse anyway.
pub fn check_audio(audio: &[u8], file_name: &str) -> Result<()> {
    if audio.is_empty() {
        return Err(RunbookError::Transcription(format!("{file_name} is empty")));
    }
    if audio.len() > MAX_AUDIO_BYTES {
        return Err(RunbookError::Transcription(format!(
            "{file_name} is {} bytes, please upload a file smaller than 2MB",
            audio.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    fn name(&self) -> &str {
        "openai"
    }

    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String> {
        check_audio(&audio, file_name)?;
        info!(file = %file_name, bytes = audio.len(), "transcribing audio");

        let part = reqwest::multipart::Part::bytes(audio).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RunbookError::Transcription(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RunbookError::Transcription(format!("HTTP {status}: {text}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RunbookError::Transcription(e.to_string()))?;
        let text = data["text"]
            .as_str()
            .ok_or_else(|| RunbookError::Transcription("response has no text field".into()))?
            .to_string();
        debug!(chars = text.len(), "transcription complete");
        Ok(text)
    }
}
