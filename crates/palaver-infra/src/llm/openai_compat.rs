//! OpenAI-compatible chat generator.
//!
//! A single [`OpenAiChatGenerator`] serves the Google OpenAI-compatible
//! beta endpoint (Gemini and Gemma model ids), OpenRouter, and Groq --
//! three endpoints from one codebase via configurable base URLs.
//!
//! Uses [`async_openai`] for type-safe request/response handling.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
    ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequest, ImageUrl,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use palaver_core::llm::generate::{GenerationRequest, Generator};
use palaver_observe::genai_attrs;
use palaver_types::chat::Speaker;
use palaver_types::error::GenerateError;

const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Unified generator for any OpenAI-compatible chat endpoint.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`.
#[derive(Clone)]
pub struct OpenAiChatGenerator {
    client: Client<OpenAIConfig>,
    provider_name: String,
}

impl OpenAiChatGenerator {
    /// Create a generator against an arbitrary OpenAI-compatible endpoint.
    pub fn new(provider_name: &str, base_url: &str, api_key: &SecretString) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url);

        Self {
            client: Client::with_config(config),
            provider_name: provider_name.to_string(),
        }
    }

    /// The Google endpoint (serves Gemini and Gemma model ids).
    pub fn google(api_key: &SecretString, base_url: Option<&str>) -> Self {
        Self::new("google", base_url.unwrap_or(GOOGLE_BASE_URL), api_key)
    }

    /// The OpenRouter endpoint.
    pub fn openrouter(api_key: &SecretString, base_url: Option<&str>) -> Self {
        Self::new("openrouter", base_url.unwrap_or(OPENROUTER_BASE_URL), api_key)
    }

    /// The Groq endpoint.
    pub fn groq(api_key: &SecretString, base_url: Option<&str>) -> Self {
        Self::new("groq", base_url.unwrap_or(GROQ_BASE_URL), api_key)
    }

    /// Build a [`CreateChatCompletionRequest`] from a [`GenerationRequest`].
    fn build_request(&self, request: &GenerationRequest) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        // Persona instructions become the system message.
        if let Some(ref system) = request.system_instructions {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }

        // The truncated window, oldest first.
        for turn in &request.history {
            let message = match turn.speaker {
                Speaker::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(turn.text.clone()),
                        name: None,
                    })
                }
                Speaker::Model => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            turn.text.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            };
            messages.push(message);
        }

        // The new message; an attached photo rides along as a data URL.
        let content = match &request.image {
            None => ChatCompletionRequestUserMessageContent::Text(request.text.clone()),
            Some(image) => {
                let data_url = format!(
                    "data:image/jpeg;base64,{}",
                    BASE64_STANDARD.encode(image)
                );
                ChatCompletionRequestUserMessageContent::Array(vec![
                    ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText {
                            text: request.text.clone(),
                        },
                    ),
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: data_url,
                                detail: None,
                            },
                        },
                    ),
                ])
            }
        };
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content,
                name: None,
            },
        ));

        CreateChatCompletionRequest {
            model: request.model_id.clone(),
            messages,
            ..Default::default()
        }
    }
}

// OpenAiChatGenerator intentionally does NOT derive Debug to prevent
// accidental exposure of internal state including the API key inside the
// async-openai Client.

impl Generator for OpenAiChatGenerator {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        let oai_request = self.build_request(request);
        debug!(
            { genai_attrs::GEN_AI_OPERATION_NAME } = genai_attrs::OP_CHAT,
            { genai_attrs::GEN_AI_PROVIDER_NAME } = self.provider_name.as_str(),
            { genai_attrs::GEN_AI_REQUEST_MODEL } = request.model_id.as_str(),
            history_turns = request.history.len(),
            "chat request"
        );

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(GenerateError::MalformedResponse(
                "completion contained no text".to_string(),
            ));
        }
        Ok(content)
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`GenerateError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> GenerateError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => GenerateError::Provider {
            message: api_err.message.clone(),
        },
        OpenAIError::Reqwest(reqwest_err) => GenerateError::Request(reqwest_err.to_string()),
        OpenAIError::JSONDeserialize(_, content) => {
            GenerateError::MalformedResponse(format!("failed to parse response: {content}"))
        }
        _ => GenerateError::Request(err.to_string()),
    }
}
