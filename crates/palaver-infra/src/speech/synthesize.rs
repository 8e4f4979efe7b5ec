//! GoogleSynthesizer -- text-to-speech over the `generateContent` endpoint.
//!
//! Asks a TTS-capable model for an audio response and decodes the inline
//! base64 payload into an [`AudioClip`]. Container conversion (PCM to
//! OGG/Opus and friends) is the transport's problem, not this crate's.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use palaver_core::collab::{AudioClip, Synthesizer};
use palaver_observe::genai_attrs;
use palaver_types::error::SpeechError;

use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    PrebuiltVoiceConfig, SpeechConfig, VoiceConfig,
};

/// Default TTS model.
const DEFAULT_SYNTHESIS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Text-to-speech collaborator backed by the Google API.
pub struct GoogleSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GoogleSynthesizer {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_model(api_key, DEFAULT_SYNTHESIS_MODEL)
    }

    pub fn with_model(api_key: SecretString, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: model.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

// GoogleSynthesizer intentionally does NOT derive Debug to prevent
// accidental exposure of the API key.

impl Synthesizer for GoogleSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_hint: Option<&str>,
    ) -> Result<AudioClip, SpeechError> {
        debug!(
            { genai_attrs::GEN_AI_OPERATION_NAME } = genai_attrs::OP_SYNTHESIZE_SPEECH,
            { genai_attrs::GEN_AI_PROVIDER_NAME } = genai_attrs::PROVIDER_GOOGLE,
            { genai_attrs::GEN_AI_REQUEST_MODEL } = self.model.as_str(),
            text_chars = text.chars().count(),
            "synthesis request"
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(text)],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: voice_hint.map(|voice| SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
            }),
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| SpeechError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| SpeechError::MalformedResponse(err.to_string()))?;

        let inline = body.first_inline_data().ok_or(SpeechError::EmptyAudio)?;
        let data = BASE64_STANDARD
            .decode(&inline.data)
            .map_err(|err| SpeechError::MalformedResponse(err.to_string()))?;
        if data.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        Ok(AudioClip {
            data,
            mime: inline.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_targets_the_tts_model() {
        let synthesizer = GoogleSynthesizer::new(SecretString::from("key".to_string()));
        assert_eq!(
            synthesizer.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"
        );
    }

    #[test]
    fn custom_model_changes_url() {
        let synthesizer =
            GoogleSynthesizer::with_model(SecretString::from("key".to_string()), "other-tts");
        assert!(synthesizer.url().contains("/other-tts:"));
    }
}
