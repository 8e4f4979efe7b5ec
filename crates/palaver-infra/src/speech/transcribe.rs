//! GoogleTranscriber -- speech-to-text over the `generateContent` endpoint.
//!
//! Sends the voice message as inline base64 audio together with a fixed
//! transcription prompt and returns the recognized text. No streaming;
//! one slow call per voice message.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use palaver_core::collab::Transcriber;
use palaver_observe::genai_attrs;
use palaver_types::error::TranscribeError;

use super::types::{Content, GenerateContentRequest, GenerateContentResponse, Part};

/// Model used when the pipeline passes no hint.
const DEFAULT_TRANSCRIPTION_MODEL: &str = "gemini-2.5-flash-lite";

/// Prompt instructing the model to return the bare transcript.
const DEFAULT_TRANSCRIPTION_PROMPT: &str = "Transcribe the speech, output the text only";

/// Inbound voice messages arrive as OGG/Opus from the transport.
const VOICE_MIME_TYPE: &str = "audio/ogg";

/// Speech-to-text collaborator backed by the Google API.
pub struct GoogleTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    prompt: String,
}

impl GoogleTranscriber {
    /// Create a transcriber with the default prompt.
    pub fn new(api_key: SecretString) -> Self {
        Self::with_prompt(api_key, DEFAULT_TRANSCRIPTION_PROMPT)
    }

    /// Create a transcriber with a custom transcription prompt.
    pub fn with_prompt(api_key: SecretString, prompt: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            prompt: prompt.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

// GoogleTranscriber intentionally does NOT derive Debug to prevent
// accidental exposure of the API key.

impl Transcriber for GoogleTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        model_hint: Option<&str>,
    ) -> Result<String, TranscribeError> {
        let model = model_hint.unwrap_or(DEFAULT_TRANSCRIPTION_MODEL);
        debug!(
            { genai_attrs::GEN_AI_OPERATION_NAME } = genai_attrs::OP_TRANSCRIBE,
            { genai_attrs::GEN_AI_PROVIDER_NAME } = genai_attrs::PROVIDER_GOOGLE,
            { genai_attrs::GEN_AI_REQUEST_MODEL } = model,
            audio_bytes = audio.len(),
            "transcription request"
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(self.prompt.clone()),
                    Part::inline_data(VOICE_MIME_TYPE, BASE64_STANDARD.encode(audio)),
                ],
            }],
            generation_config: None,
        };

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| TranscribeError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| TranscribeError::MalformedResponse(err.to_string()))?;

        body.first_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                TranscribeError::MalformedResponse("response contained no text".to_string())
            })
    }
}
