//! Speech-to-Text (STT): convert an uploaded audio clip into text.
//!
//! Implement `SttBackend` for a remote provider, or use `PlaceholderStt` to
//! run the gateway without credentials. `OpenAiStt` speaks the
//! OpenAI-compatible `/audio/transcriptions` protocol (OpenAI Whisper,
//! OpenRouter, Groq, local whisper.cpp servers, etc.).

use crate::error::{SttError, SttResult};
use async_trait::async_trait;

/// Returned (and archived) in place of an empty provider result.
pub const NO_SPEECH_PLACEHOLDER: &str = "[no speech detected]";

/// Backend for converting audio bytes to text. The filename carries the
/// container format hint (`.webm`, `.wav`, ...) through to the provider.
#[async_trait]
pub trait SttBackend: Send + Sync {
    /// Transcribe one clip; return an empty string if nothing was detected.
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> SttResult<String>;
}

/// Placeholder STT: returns a fixed string. Use for running the gateway
/// without provider credentials and for testing the upload flow.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    /// If set, return this instead of the default message.
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: String) -> Self {
        Self { response: Some(s) }
    }
}

#[async_trait]
impl SttBackend for PlaceholderStt {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> SttResult<String> {
        if let Some(ref r) = self.response {
            return Ok(r.clone());
        }
        Ok(format!(
            "[STT placeholder: {} bytes from {}; set STT_API_KEY for real transcription]",
            audio.len(),
            filename
        ))
    }
}

/// Production STT backend: OpenAI-compatible transcription API.
/// Uses `STT_API_URL` (e.g. https://api.openai.com/v1), `STT_API_KEY`, and
/// `STT_MODEL` (default whisper-1).
#[derive(Debug, Clone)]
pub struct OpenAiStt {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model: whisper-1 or gpt-4o-transcribe, etc.
    pub model: String,
    client: reqwest::Client,
}

impl OpenAiStt {
    /// Build from environment: STT_API_URL, STT_API_KEY, STT_MODEL.
    pub fn from_env() -> SttResult<Self> {
        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("STT_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SttError::Config("STT requires STT_API_KEY".to_string()))?;
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        Self::new(base_url, api_key, model)
    }

    /// Create with explicit config.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> SttResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SttError::Provider(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl SttBackend for OpenAiStt {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> SttResult<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        tracing::debug!(target: "scribe::stt", "Transcribing {} ({} bytes) via {}", filename, audio.len(), url);
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))
            .map_err(|e| SttError::Provider(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SttError::Provider(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SttError::Provider(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| SttError::Provider(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(text)
    }
}

/// Content type from the upload's file extension. Unknown extensions fall
/// back to webm, the browser MediaRecorder default.
fn mime_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => "audio/webm",
    }
}

/// Create the best available STT backend from environment.
/// Priority: OpenAiStt when `STT_API_KEY` is set, PlaceholderStt otherwise.
pub fn create_best_stt() -> SttResult<Box<dyn SttBackend>> {
    if let Ok(open) = OpenAiStt::from_env() {
        return Ok(Box::new(open));
    }
    Ok(Box::new(PlaceholderStt::new()))
}
